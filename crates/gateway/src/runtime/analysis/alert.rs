//! Outbound alert when a record's extraction is given up on.

use std::time::Duration;

use cc_domain::record::CallRecord;
use chrono::Utc;
use serde_json::Value;

const MAX_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct ExtractionAlerter {
    url: String,
    client: reqwest::Client,
    base_backoff: Duration,
}

impl ExtractionAlerter {
    pub fn new(url: impl Into<String>, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent.to_string())
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
            base_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn payload(record: &CallRecord, error: &str) -> Value {
        serde_json::json!({
            "event": "extraction_failed",
            "recordId": record.id,
            "elderId": record.elder_id,
            "error": error,
            "at": Utc::now(),
        })
    }

    /// Fire and forget.
    pub fn notify(&self, record: &CallRecord, error: &str) {
        let payload = Self::payload(record, error);
        let this = self.clone();
        let record_id = record.id;
        tokio::spawn(async move {
            this.deliver(record_id, &payload).await;
        });
    }

    /// POST `payload`, retrying 5xx and transport errors with exponential
    /// backoff. Returns whether the hook accepted it.
    pub async fn deliver(&self, record_id: i64, payload: &Value) -> bool {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.client.post(&self.url).json(payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(record_id, status = %resp.status(), attempt, "extraction alert delivered");
                    return true;
                }
                Ok(resp) if resp.status().is_server_error() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(record_id, status = %resp.status(), attempt, "alert hook 5xx, will retry");
                }
                Ok(resp) => {
                    tracing::warn!(record_id, status = %resp.status(), attempt, "alert hook rejected the alert");
                    return false;
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(record_id, error = %e, attempt, "alert hook unreachable, will retry");
                }
                Err(e) => {
                    tracing::error!(record_id, error = %e, attempt, "alert hook unreachable, giving up");
                    return false;
                }
            }
            tokio::time::sleep(self.base_backoff * (1 << (attempt - 1))).await;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;

    async fn hook(statuses: Vec<StatusCode>) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let statuses = Arc::new(statuses);
        let app = Router::new().route(
            "/hook",
            post(move || {
                let counter = counter.clone();
                let statuses = statuses.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
                    statuses.get(n).copied().unwrap_or(StatusCode::OK)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), hits)
    }

    fn payload() -> Value {
        serde_json::json!({"event": "extraction_failed", "recordId": 1})
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let (url, hits) = hook(vec![StatusCode::BAD_GATEWAY, StatusCode::SERVICE_UNAVAILABLE]).await;
        let alerter = ExtractionAlerter::new(url, "test").with_base_backoff(Duration::from_millis(5));
        assert!(alerter.deliver(1, &payload()).await);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (url, hits) = hook(vec![StatusCode::BAD_REQUEST]).await;
        let alerter = ExtractionAlerter::new(url, "test").with_base_backoff(Duration::from_millis(5));
        assert!(!alerter.deliver(1, &payload()).await);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
