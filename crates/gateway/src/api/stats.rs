//! Daily and weekly statistics reads.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use cc_domain::care::ElderId;
use cc_domain::error::Error;
use cc_domain::stats::{DailyStatistics, WeeklyStatistics};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    pub week_start: Option<NaiveDate>,
}

/// Today in the service timezone.
fn today(state: &AppState) -> NaiveDate {
    match state.config.scheduler.tz() {
        Ok(tz) => Utc::now().with_timezone(&tz).date_naive(),
        Err(_) => Utc::now().date_naive(),
    }
}

async fn ensure_elder(state: &AppState, elder_id: ElderId) -> Result<(), Error> {
    match state.directory.profile(elder_id).await {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(format!("elder {elder_id}"))),
    }
}

/// `GET /v1/elders/:id/statistics/daily?date=`
pub async fn daily(
    State(state): State<AppState>,
    Path(elder_id): Path<ElderId>,
    Query(q): Query<DailyQuery>,
) -> ApiResult<Json<DailyStatistics>> {
    ensure_elder(&state, elder_id).await?;
    let date = q.date.unwrap_or_else(|| today(&state));
    Ok(Json(state.stats.daily(elder_id, date).await))
}

/// `GET /v1/elders/:id/statistics/weekly?week_start=`. Any day of the
/// week selects that week.
pub async fn weekly(
    State(state): State<AppState>,
    Path(elder_id): Path<ElderId>,
    Query(q): Query<WeeklyQuery>,
) -> ApiResult<Json<WeeklyStatistics>> {
    ensure_elder(&state, elder_id).await?;
    let day = q.week_start.unwrap_or_else(|| today(&state));
    Ok(Json(state.stats.weekly(elder_id, day).await))
}
