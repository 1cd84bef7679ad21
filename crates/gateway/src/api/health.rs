//! Readiness check.

use axum::extract::State;
use axum::response::Json;
use serde_json::Value;

use crate::state::AppState;

/// `GET /v1/health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "llm_providers": state.llm.list_providers(),
        "scheduler_enabled": state.config.scheduler.enabled,
        "telephony_configured": state.config.telephony.url.is_some(),
    }))
}
