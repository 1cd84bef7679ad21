//! Elder profiles, call settings and on-demand calls.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use cc_domain::care::{
    hhmm, CallSetting, Disease, Elder, ElderId, ElderProfile, ElderStatus, HealthProfile, MedicationSchedule, MedicationTime,
};
use cc_domain::error::Error;
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::Value;

use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutElderRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub status: ElderStatus,
    #[serde(default)]
    pub health_notes: Vec<String>,
    #[serde(default)]
    pub diseases: Vec<String>,
    #[serde(default)]
    pub medications: Vec<MedicationInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationInput {
    pub name: String,
    pub schedule_time: MedicationTime,
}

impl PutElderRequest {
    fn into_profile(self, id: ElderId) -> ElderProfile {
        let notes: Vec<String> = self
            .health_notes
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        ElderProfile {
            elder: Elder {
                id,
                name: self.name,
                phone: self.phone,
                status: self.status,
            },
            health: (!notes.is_empty()).then_some(HealthProfile { notes }),
            diseases: self
                .diseases
                .into_iter()
                .filter(|d| !d.trim().is_empty())
                .map(|name| Disease { name })
                .collect(),
            medications: self
                .medications
                .into_iter()
                .map(|m| MedicationSchedule {
                    id: 0,
                    name: m.name,
                    schedule_time: m.schedule_time,
                })
                .collect(),
        }
    }
}

/// `GET /v1/elders/:id`
pub async fn get_elder(State(state): State<AppState>, Path(id): Path<ElderId>) -> ApiResult<Json<ElderProfile>> {
    let profile = state
        .directory
        .profile(id)
        .await
        .ok_or_else(|| Error::NotFound(format!("elder {id}")))?;
    Ok(Json(profile))
}

/// `PUT /v1/elders/:id`: create or replace the whole profile.
pub async fn put_elder(
    State(state): State<AppState>,
    Path(id): Path<ElderId>,
    Json(body): Json<PutElderRequest>,
) -> ApiResult<Json<ElderProfile>> {
    let saved = state.directory.put_profile(body.into_profile(id)).await?;
    Ok(Json(saved))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutCallSettingRequest {
    pub first_call_time: String,
    pub second_call_time: String,
    pub third_call_time: String,
}

fn parse_time(field: &str, raw: &str) -> Result<NaiveTime, Error> {
    hhmm::parse(raw).ok_or_else(|| Error::InvalidInput(format!("{field}: expected HH:mm, got {raw:?}")))
}

/// `GET /v1/elders/:id/call-setting`
pub async fn get_call_setting(State(state): State<AppState>, Path(id): Path<ElderId>) -> ApiResult<Json<CallSetting>> {
    let setting = state
        .directory
        .setting_for_elder(id)
        .await
        .ok_or_else(|| Error::NotFound(format!("call setting for elder {id}")))?;
    Ok(Json(setting))
}

/// `PUT /v1/elders/:id/call-setting`: misordered times are rejected
/// with 422.
pub async fn put_call_setting(
    State(state): State<AppState>,
    Path(id): Path<ElderId>,
    Json(body): Json<PutCallSettingRequest>,
) -> ApiResult<Json<CallSetting>> {
    let first = parse_time("firstCallTime", &body.first_call_time)?;
    let second = parse_time("secondCallTime", &body.second_call_time)?;
    let third = parse_time("thirdCallTime", &body.third_call_time)?;
    let setting = state.directory.put_setting(id, first, second, third).await?;
    Ok(Json(setting))
}

/// `POST /v1/elders/:id/calls/immediate`
pub async fn call_immediately(
    State(state): State<AppState>,
    Path(id): Path<ElderId>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let message = state.dispatcher.dispatch_immediate(id).await?;
    Ok((StatusCode::OK, Json(serde_json::json!({ "message": message }))))
}
