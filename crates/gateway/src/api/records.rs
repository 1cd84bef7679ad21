//! Call record reads and reanalysis.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use cc_domain::care::ElderId;
use cc_domain::error::Error;
use cc_domain::record::{CallRecord, RecordId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use crate::runtime::analysis::request_reanalysis;
use crate::state::AppState;
use crate::store::RecordHealthData;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetail {
    pub record: CallRecord,
    pub health_data: RecordHealthData,
}

/// `GET /v1/call-records/:id`: the record with its health rows.
pub async fn get_record(State(state): State<AppState>, Path(id): Path<RecordId>) -> ApiResult<Json<RecordDetail>> {
    let record = state
        .records
        .get(id)
        .await
        .ok_or_else(|| Error::NotFound(format!("call record {id}")))?;
    let health_data = state.health.for_record(id).await;
    Ok(Json(RecordDetail { record, health_data }))
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

/// `GET /v1/elders/:id/call-records?date=YYYY-MM-DD`
pub async fn list_for_elder(
    State(state): State<AppState>,
    Path(elder_id): Path<ElderId>,
    Query(q): Query<DateQuery>,
) -> ApiResult<Json<Vec<CallRecord>>> {
    if state.directory.profile(elder_id).await.is_none() {
        return Err(Error::NotFound(format!("elder {elder_id}")).into());
    }
    Ok(Json(state.records.list_for_elder_on(elder_id, q.date).await))
}

/// `POST /v1/call-records/:id/reanalyze`: clear derived data and queue
/// the record again.
pub async fn reanalyze(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> ApiResult<(StatusCode, Json<CallRecord>)> {
    let record = request_reanalysis(&state.records, &state.health, &state.queue, &state.record_locks, id).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}
