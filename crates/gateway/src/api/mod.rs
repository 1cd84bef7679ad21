pub mod auth;
pub mod call_data;
pub mod elders;
pub mod error;
pub mod health;
pub mod records;
pub mod scheduler;
pub mod stats;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **protected**
/// (gated behind the bearer-token middleware). `/call-data` is protected
/// too and may additionally be HMAC-signed.
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/v1/health", get(health::health));

    let protected = Router::new()
        // Telephony completion webhook
        .route("/call-data", post(call_data::receive_call_data))
        // Elders and call settings
        .route("/v1/elders/:id", get(elders::get_elder).put(elders::put_elder))
        .route(
            "/v1/elders/:id/call-setting",
            get(elders::get_call_setting).put(elders::put_call_setting),
        )
        .route("/v1/elders/:id/calls/immediate", post(elders::call_immediately))
        // Call records
        .route("/v1/elders/:id/call-records", get(records::list_for_elder))
        .route("/v1/call-records/:id", get(records::get_record))
        .route("/v1/call-records/:id/reanalyze", post(records::reanalyze))
        // Statistics
        .route("/v1/elders/:id/statistics/daily", get(stats::daily))
        .route("/v1/elders/:id/statistics/weekly", get(stats::weekly))
        // Scheduler
        .route("/v1/scheduler/tick", post(scheduler::tick_now))
        // Apply API auth middleware to all protected routes.
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_token));

    public.merge(protected)
}
