//! Manual scheduler trigger.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use super::error::{api_error, ApiError};
use crate::state::AppState;

/// `POST /v1/scheduler/tick`: run one tick now and return its report.
/// 409 while another tick is in progress.
pub async fn tick_now(State(state): State<AppState>) -> Response {
    match state.scheduler.tick().await {
        Ok(Some(report)) => Json(report).into_response(),
        Ok(None) => api_error(StatusCode::CONFLICT, "a scheduler tick is already running"),
        Err(e) => ApiError(e).into_response(),
    }
}
