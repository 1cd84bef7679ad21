//! `POST /call-data`: completion webhook from the telephony service.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use super::auth::verify_signature;
use super::error::{api_error, ApiError};
use crate::runtime::ingest::CallCompletion;
use crate::state::AppState;

/// Persist the completed call and return it: 201 when new, 200 when the
/// same completion was already recorded. Analysis runs afterwards.
pub async fn receive_call_data(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(secret) = &state.call_data_secret {
        if !verify_signature(secret, &headers, &body) {
            tracing::warn!("call-data rejected: bad or missing signature");
            return api_error(StatusCode::UNAUTHORIZED, "invalid call-data signature");
        }
    }

    let payload: CallCompletion = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, format!("invalid call-data payload: {e}")),
    };

    match state.ingester.ingest(payload).await {
        Ok((record, true)) => (StatusCode::CREATED, Json(record)).into_response(),
        Ok((record, false)) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}
