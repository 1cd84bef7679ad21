//! LLM calls of the pipeline: retried extraction and the symptom comment.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cc_domain::chat::Message;
use cc_domain::config::AnalysisConfig;
use cc_domain::error::{Error, Result};
use cc_domain::signals::ExtractedHealthSignals;
use cc_providers::{ChatRequest, LlmProvider};
use chrono::NaiveDate;

use super::prompt::{extraction_messages, symptom_messages};
use crate::runtime::metrics::PipelineMetrics;

/// A provider plus the model override its role asked for.
#[derive(Clone)]
pub struct LlmBinding {
    pub provider: Arc<dyn LlmProvider>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            backoff: Duration::from_millis(cfg.backoff_ms),
            attempt_timeout: Duration::from_millis(cfg.attempt_timeout_ms),
        }
    }
}

pub struct HealthExtractor {
    policy: RetryPolicy,
    temperature: f32,
}

impl HealthExtractor {
    pub fn new(policy: RetryPolicy, temperature: f32) -> Self {
        Self { policy, temperature }
    }

    /// Extract structured signals, retrying any failure (transport,
    /// timeout, empty or unparseable output) up to `max_attempts` times
    /// with a fixed backoff.
    pub async fn extract(
        &self,
        llm: &LlmBinding,
        call_date: NaiveDate,
        transcript: &str,
        medication_names: &[String],
        metrics: &mut PipelineMetrics,
    ) -> Result<ExtractedHealthSignals> {
        let messages = extraction_messages(call_date, transcript, medication_names);
        let max = self.policy.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max {
            match self.attempt(llm, &messages, metrics).await {
                Ok(signals) => {
                    if attempt > 1 {
                        tracing::info!(record_id = metrics.record_id, attempt, "extraction succeeded after retry");
                    }
                    return Ok(signals);
                }
                Err(e) => {
                    tracing::warn!(
                        record_id = metrics.record_id,
                        attempt,
                        max_attempts = max,
                        error = %e,
                        "extraction attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < max {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }

        Err(Error::Extraction(format!("gave up after {max} attempts: {last_error}")))
    }

    async fn attempt(
        &self,
        llm: &LlmBinding,
        messages: &[Message],
        metrics: &mut PipelineMetrics,
    ) -> Result<ExtractedHealthSignals> {
        let req = ChatRequest {
            messages: messages.to_vec(),
            temperature: Some(self.temperature),
            json_mode: true,
            model: llm.model.clone(),
            ..Default::default()
        };
        let content = timed_chat(llm, &req, self.policy.attempt_timeout, metrics).await?;
        parse_signals(&content)
    }

    /// One-sentence comment on the reported symptoms. Not retried.
    pub async fn comment_on_symptoms(
        &self,
        llm: &LlmBinding,
        symptoms: &[String],
        metrics: &mut PipelineMetrics,
    ) -> Result<String> {
        let messages = symptom_messages(symptoms)
            .ok_or_else(|| Error::InvalidInput("no symptoms to summarize".into()))?;
        let req = ChatRequest {
            messages,
            temperature: Some(self.temperature),
            model: llm.model.clone(),
            ..Default::default()
        };
        let content = timed_chat(llm, &req, self.policy.attempt_timeout, metrics).await?;
        let comment = content.trim();
        if comment.is_empty() {
            return Err(Error::Extraction("empty symptom comment".into()));
        }
        Ok(comment.to_string())
    }
}

async fn timed_chat(
    llm: &LlmBinding,
    req: &ChatRequest,
    limit: Duration,
    metrics: &mut PipelineMetrics,
) -> Result<String> {
    let started = Instant::now();
    let result = match tokio::time::timeout(limit, llm.provider.chat(req)).await {
        Ok(r) => r,
        Err(_) => Err(Error::Timeout(format!(
            "{} did not answer within {}ms",
            llm.provider.provider_id(),
            limit.as_millis()
        ))),
    };
    metrics.llm_call(started.elapsed(), result.is_ok());
    result.map(|resp| resp.content)
}

/// Parse model output into signals. Tolerates a surrounding Markdown code
/// fence; blank output is an error.
pub fn parse_signals(raw: &str) -> Result<ExtractedHealthSignals> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(Error::Extraction("empty LLM response".into()));
    }
    serde_json::from_str(body).map_err(|e| Error::Extraction(format!("unparseable LLM response: {e}")))
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_parses() {
        let s = parse_signals(r#"{"healthStatus": "good"}"#).unwrap();
        assert_eq!(s.health_status.as_deref(), Some("good"));
    }

    #[test]
    fn fenced_json_parses() {
        let raw = "```json\n{\"psychologicalStatus\": \"bad\"}\n```\n";
        let s = parse_signals(raw).unwrap();
        assert_eq!(s.psychological_status.as_deref(), Some("bad"));

        let bare_fence = "```\n{}\n```";
        assert!(parse_signals(bare_fence).is_ok());
    }

    #[test]
    fn empty_and_garbage_are_extraction_errors() {
        assert!(matches!(parse_signals("  \n"), Err(Error::Extraction(_))));
        assert!(matches!(parse_signals("```json\n```"), Err(Error::Extraction(_))));
        assert!(matches!(parse_signals("죄송합니다"), Err(Error::Extraction(_))));
    }

    #[test]
    fn retry_policy_never_allows_zero_attempts() {
        let cfg = AnalysisConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from_config(&cfg).max_attempts, 1);
    }
}
