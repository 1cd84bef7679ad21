use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transcript analysis
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Extraction attempts per record, including the first.
    #[serde(default = "d_3")]
    pub max_attempts: u32,
    /// Fixed delay between extraction attempts.
    #[serde(default = "d_1000")]
    pub backoff_ms: u64,
    /// Upper bound on a single extraction attempt.
    #[serde(default = "d_60000")]
    pub attempt_timeout_ms: u64,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    /// Registry role used for extraction.
    #[serde(default = "d_extractor")]
    pub extraction_role: String,
    /// Registry role used for the one-line symptom comment.
    #[serde(default = "d_summarizer")]
    pub summary_role: String,
    #[serde(default = "d_true")]
    pub symptom_comment: bool,
    #[serde(default = "d_256")]
    pub queue_capacity: usize,
    #[serde(default = "d_4")]
    pub worker_concurrency: usize,
    #[serde(default = "d_300")]
    pub recovery_interval_secs: u64,
    /// Records younger than this are left to their in-flight job.
    #[serde(default = "d_120")]
    pub recovery_grace_secs: u64,
    /// Receives `extraction_failed` events. Disabled when `None`.
    #[serde(default)]
    pub alert_webhook_url: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1000,
            attempt_timeout_ms: 60_000,
            temperature: 0.1,
            extraction_role: d_extractor(),
            summary_role: d_summarizer(),
            symptom_comment: true,
            queue_capacity: 256,
            worker_concurrency: 4,
            recovery_interval_secs: 300,
            recovery_grace_secs: 120,
            alert_webhook_url: None,
        }
    }
}

fn d_3() -> u32 {
    3
}
fn d_4() -> usize {
    4
}
fn d_1000() -> u64 {
    1000
}
fn d_60000() -> u64 {
    60_000
}
fn d_temperature() -> f32 {
    0.1
}
fn d_extractor() -> String {
    "extractor".into()
}
fn d_summarizer() -> String {
    "summarizer".into()
}
fn d_true() -> bool {
    true
}
fn d_256() -> usize {
    256
}
fn d_300() -> u64 {
    300
}
fn d_120() -> u64 {
    120
}
