//! Call-completion ingestion.
//!
//! The telephony service reports every finished call here. The record is
//! written synchronously; analysis is queued only after the write returns
//! and only for a newly created record, so redeliveries of the same
//! payload are harmless.

use std::sync::Arc;

use cc_domain::care::{ElderId, SettingId};
use cc_domain::error::{Error, Result};
use cc_domain::record::{AnalysisStage, CallRecord, CallStatus};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::runtime::analysis::queue::{AnalysisJob, AnalysisQueue, JobReason};
use crate::store::{CallRecordStore, ElderDirectory};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Webhook payload
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCompletion {
    pub elder_id: ElderId,
    pub setting_id: SettingId,
    pub status: CallStatus,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// `1` when the elder picked up, `0` otherwise.
    pub responded: u8,
    #[serde(default)]
    pub transcription: Option<Transcription>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub full_text: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl CallCompletion {
    /// `"speaker: text"` lines; segments without a speaker contribute their
    /// text alone and blank segments are dropped. `None` when nothing is left.
    pub fn transcript_text(&self) -> Option<String> {
        let transcription = self.transcription.as_ref()?;
        let lines: Vec<String> = transcription
            .full_text
            .iter()
            .filter_map(|seg| {
                let text = seg.text.as_deref().map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    return None;
                }
                match seg.speaker.as_deref().map(str::trim) {
                    Some(speaker) if !speaker.is_empty() => Some(format!("{speaker}: {text}")),
                    _ => Some(text.to_string()),
                }
            })
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// SHA-256 over every field that identifies the delivery.
    pub fn idempotency_key(&self, transcript: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        let mut field = |v: &str| {
            hasher.update(v.as_bytes());
            hasher.update([0x1f]);
        };
        field(&self.elder_id.to_string());
        field(&self.setting_id.to_string());
        field(self.status.as_str());
        field(&self.start_time.map(|t| t.to_rfc3339()).unwrap_or_default());
        field(&self.end_time.map(|t| t.to_rfc3339()).unwrap_or_default());
        field(&self.responded.to_string());
        field(transcript.unwrap_or_default());
        hex::encode(hasher.finalize())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ingester
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct CompletionIngester {
    directory: Arc<ElderDirectory>,
    records: Arc<CallRecordStore>,
    queue: Arc<AnalysisQueue>,
    tz: Tz,
}

impl CompletionIngester {
    pub fn new(
        directory: Arc<ElderDirectory>,
        records: Arc<CallRecordStore>,
        queue: Arc<AnalysisQueue>,
        tz: Tz,
    ) -> Self {
        Self {
            directory,
            records,
            queue,
            tz,
        }
    }

    /// Persist a completion. Returns the record and whether it was created
    /// (`false` on redelivery).
    pub async fn ingest(&self, payload: CallCompletion) -> Result<(CallRecord, bool)> {
        if payload.responded > 1 {
            return Err(Error::InvalidInput(format!(
                "responded must be 0 or 1, got {}",
                payload.responded
            )));
        }
        if self.directory.profile(payload.elder_id).await.is_none() {
            return Err(Error::NotFound(format!("elder {}", payload.elder_id)));
        }
        let setting = self
            .directory
            .setting(payload.setting_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("call setting {}", payload.setting_id)))?;
        if setting.elder_id != payload.elder_id {
            return Err(Error::InvalidInput(format!(
                "call setting {} does not belong to elder {}",
                setting.id, payload.elder_id
            )));
        }

        let transcript = payload.transcript_text();
        let now = Utc::now();
        let called_at = payload
            .start_time
            .unwrap_or(now)
            .with_timezone(&self.tz)
            .naive_local();

        let record = CallRecord {
            id: 0,
            elder_id: payload.elder_id,
            setting_id: payload.setting_id,
            called_at,
            start_time: payload.start_time,
            end_time: payload.end_time,
            status: payload.status,
            responded: payload.responded == 1,
            idempotency_key: payload.idempotency_key(transcript.as_deref()),
            transcript,
            sleep_start: None,
            sleep_end: None,
            psych_status: None,
            psych_details: None,
            health_status: None,
            health_details: None,
            ai_health_comment: None,
            ai_extracted_json: None,
            analysis: AnalysisStage::Ingested,
            stats_updated: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let (record, created) = self.records.insert_unique(record).await?;
        if created {
            tracing::info!(
                record_id = record.id,
                elder_id = record.elder_id,
                status = record.status.as_str(),
                "call record ingested"
            );
            self.queue.enqueue(AnalysisJob {
                record_id: record.id,
                reason: JobReason::Ingested,
            });
        } else {
            tracing::info!(record_id = record.id, "duplicate call completion, returning existing record");
        }
        Ok((record, created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(segments: Vec<(Option<&str>, Option<&str>)>) -> CallCompletion {
        CallCompletion {
            elder_id: 1,
            setting_id: 2,
            status: CallStatus::Completed,
            start_time: None,
            end_time: None,
            responded: 1,
            transcription: Some(Transcription {
                language: Some("ko".into()),
                full_text: segments
                    .into_iter()
                    .map(|(speaker, text)| TranscriptSegment {
                        speaker: speaker.map(String::from),
                        text: text.map(String::from),
                    })
                    .collect(),
            }),
        }
    }

    #[test]
    fn transcript_joins_segments() {
        let p = payload(vec![
            (Some("AI"), Some("안녕하세요")),
            (None, Some("네 안녕하세요")),
            (Some("어르신"), Some("  ")),
            (Some("어르신"), Some("밥 먹었어요")),
        ]);
        assert_eq!(
            p.transcript_text().as_deref(),
            Some("AI: 안녕하세요\n네 안녕하세요\n어르신: 밥 먹었어요")
        );
    }

    #[test]
    fn blank_transcription_is_none() {
        assert!(payload(vec![(Some("AI"), None)]).transcript_text().is_none());
        let mut p = payload(vec![]);
        p.transcription = None;
        assert!(p.transcript_text().is_none());
    }

    #[test]
    fn idempotency_key_depends_on_content() {
        let a = payload(vec![(Some("AI"), Some("x"))]);
        let mut b = a.clone();
        assert_eq!(a.idempotency_key(Some("x")), b.idempotency_key(Some("x")));
        b.status = CallStatus::NoAnswer;
        assert_ne!(a.idempotency_key(Some("x")), b.idempotency_key(Some("x")));
        assert_ne!(a.idempotency_key(Some("x")), a.idempotency_key(Some("y")));
    }

    #[test]
    fn payload_parses_from_webhook_json() {
        let json = r#"{
            "elderId": 1, "settingId": 2, "status": "no-answer",
            "startTime": "2025-07-27T12:30:00Z", "endTime": null,
            "responded": 0,
            "transcription": {"language": "ko", "fullText": []}
        }"#;
        let p: CallCompletion = serde_json::from_str(json).unwrap();
        assert_eq!(p.status, CallStatus::NoAnswer);
        assert!(p.start_time.is_some());
        assert!(p.transcript_text().is_none());
    }
}
