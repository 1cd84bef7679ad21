//! Post-call analysis pipeline.
//!
//! A record moves `ingested → extracting → {enriched | extraction_failed}`
//! (or straight to `skipped` without a transcript), after which the
//! statistics hooks run and `stats_updated` is set. The record's stage is
//! the only durable job state: anything left in `ingested`/`extracting`
//! is picked up again by [`recovery_sweep`].

pub mod alert;
pub mod enrich;
pub mod extract;
pub mod prompt;
pub mod queue;
pub mod savers;

use std::sync::Arc;
use std::time::Duration;

use cc_domain::care::ElderProfile;
use cc_domain::config::AnalysisConfig;
use cc_domain::error::{Error, Result};
use cc_domain::record::{AnalysisStage, CallRecord, RecordId};
use cc_domain::signals::ExtractedHealthSignals;
use cc_providers::ProviderRegistry;
use chrono::Utc;
use serde::Serialize;

use self::alert::ExtractionAlerter;
use self::enrich::{build_record_patch, symptom_list};
use self::extract::{HealthExtractor, LlmBinding, RetryPolicy};
use self::queue::{AnalysisJob, AnalysisQueue, JobReason};
use crate::runtime::metrics::PipelineMetrics;
use crate::runtime::record_lock::RecordLockMap;
use crate::runtime::stats::StatisticsAggregator;
use crate::store::{CallRecordStore, ElderDirectory, HealthDataStore, HealthRecordSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Enriched,
    ExtractionFailed,
    Skipped,
    /// The record had already reached a terminal stage.
    AlreadyProcessed,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enriched => "enriched",
            Self::ExtractionFailed => "extraction_failed",
            Self::Skipped => "skipped",
            Self::AlreadyProcessed => "already_processed",
        }
    }
}

/// Stores the pipeline reads from and writes to.
pub struct PipelineStores {
    pub records: Arc<CallRecordStore>,
    pub directory: Arc<ElderDirectory>,
    pub sink: Arc<dyn HealthRecordSink>,
    pub stats: Arc<dyn StatisticsAggregator>,
}

pub struct AnalysisPipeline {
    records: Arc<CallRecordStore>,
    directory: Arc<ElderDirectory>,
    sink: Arc<dyn HealthRecordSink>,
    stats: Arc<dyn StatisticsAggregator>,
    llm: Arc<ProviderRegistry>,
    extractor: HealthExtractor,
    alerter: Option<ExtractionAlerter>,
    locks: Arc<RecordLockMap>,
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    pub fn new(
        stores: PipelineStores,
        llm: Arc<ProviderRegistry>,
        locks: Arc<RecordLockMap>,
        config: AnalysisConfig,
        user_agent: &str,
    ) -> Self {
        let extractor = HealthExtractor::new(RetryPolicy::from_config(&config), config.temperature);
        let alerter = config
            .alert_webhook_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(|url| ExtractionAlerter::new(url, user_agent));
        Self {
            records: stores.records,
            directory: stores.directory,
            sink: stores.sink,
            stats: stores.stats,
            llm,
            extractor,
            alerter,
            locks,
            config,
        }
    }

    fn binding(&self, role: &str) -> Option<LlmBinding> {
        self.llm
            .resolve_role(role)
            .map(|(provider, model)| LlmBinding { provider, model })
    }

    /// Run the pipeline for one record.
    ///
    /// Extraction failures are absorbed into the `extraction_failed`
    /// stage; an `Err` here means the record could not be read or its
    /// stage could not be written.
    pub async fn run(&self, record_id: RecordId) -> Result<RunOutcome> {
        let _permit = self.locks.acquire(record_id).await;

        let record = self
            .records
            .get(record_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("call record {record_id}")))?;
        if record.analysis.is_terminal() {
            tracing::debug!(record_id, stage = ?record.analysis, "record already analyzed, skipping job");
            return Ok(RunOutcome::AlreadyProcessed);
        }

        let mut metrics = PipelineMetrics::start(record_id);
        let (record, outcome) = if record.has_transcript() {
            self.analyze(record, &mut metrics).await?
        } else {
            tracing::info!(record_id, status = record.status.as_str(), "no transcript, analysis skipped");
            let record = self.records.set_stage(record_id, AnalysisStage::Skipped).await?;
            (record, RunOutcome::Skipped)
        };

        self.update_statistics(&record, outcome, &mut metrics).await;
        metrics.finish(outcome.as_str());
        Ok(outcome)
    }

    async fn analyze(&self, record: CallRecord, metrics: &mut PipelineMetrics) -> Result<(CallRecord, RunOutcome)> {
        let record = self.records.set_stage(record.id, AnalysisStage::Extracting).await?;
        let profile = self.directory.profile(record.elder_id).await;
        let medication_names = profile.as_ref().map(|p| p.medication_names()).unwrap_or_default();
        let transcript = record.transcript.as_deref().unwrap_or_default();

        let extracted = match self.binding(&self.config.extraction_role) {
            Some(llm) => {
                self.extractor
                    .extract(&llm, record.call_date(), transcript, &medication_names, metrics)
                    .await
            }
            None => Err(Error::Extraction("no LLM provider is available".into())),
        };

        match extracted {
            Ok(signals) => {
                let record = self.enrich(record, profile.as_ref(), signals, metrics).await?;
                Ok((record, RunOutcome::Enriched))
            }
            Err(e) => {
                tracing::error!(record_id = record.id, error = %e, "extraction failed, transcript kept for reanalysis");
                let record = self.records.set_stage(record.id, AnalysisStage::ExtractionFailed).await?;
                if let Some(alerter) = &self.alerter {
                    alerter.notify(&record, &e.to_string());
                }
                Ok((record, RunOutcome::ExtractionFailed))
            }
        }
    }

    async fn enrich(
        &self,
        record: CallRecord,
        profile: Option<&ElderProfile>,
        signals: ExtractedHealthSignals,
        metrics: &mut PipelineMetrics,
    ) -> Result<CallRecord> {
        savers::save_all(self.sink.as_ref(), &record, profile, &signals, metrics).await;

        let slot = match self.directory.setting(record.setting_id).await {
            Some(setting) => setting.resolve_slot(record.called_at.time()),
            None => Err(Error::NotFound(format!("call setting {}", record.setting_id))),
        };
        let mut patch = build_record_patch(&signals, record.call_date(), &slot, record.id);

        if self.config.symptom_comment {
            let details = patch
                .health_details
                .as_deref()
                .or(record.health_details.as_deref())
                .unwrap_or_default();
            let symptoms = symptom_list(details);
            if !symptoms.is_empty() {
                patch.ai_health_comment = self.symptom_comment(record.id, &symptoms, metrics).await;
            }
        }

        match serde_json::to_string(&signals) {
            Ok(json) => patch.ai_extracted_json = Some(json),
            Err(e) => tracing::warn!(record_id = record.id, error = %e, "could not serialize extraction"),
        }

        let updated = self
            .records
            .apply_patch(record.id, record.version, patch, AnalysisStage::Enriched)
            .await;
        metrics.store_write(updated.is_ok());
        updated
    }

    async fn symptom_comment(
        &self,
        record_id: RecordId,
        symptoms: &[String],
        metrics: &mut PipelineMetrics,
    ) -> Option<String> {
        let Some(llm) = self.binding(&self.config.summary_role) else {
            tracing::warn!(record_id, "no LLM provider for the symptom comment");
            return None;
        };
        match self.extractor.comment_on_symptoms(&llm, symptoms, metrics).await {
            Ok(comment) => Some(comment),
            Err(e) => {
                tracing::warn!(record_id, error = %e, "symptom comment failed, leaving it unset");
                None
            }
        }
    }

    async fn update_statistics(&self, record: &CallRecord, outcome: RunOutcome, metrics: &mut PipelineMetrics) {
        if record.status.is_missed() {
            let res = self.stats.record_missed_call(record).await;
            metrics.store_write(res.is_ok());
            if let Err(e) = res {
                tracing::error!(record_id = record.id, error = %e, "missed-call statistics refresh failed");
            }
        }
        if outcome == RunOutcome::Enriched {
            let res = self.stats.record_enriched(record).await;
            metrics.store_write(res.is_ok());
            if let Err(e) = res {
                tracing::error!(record_id = record.id, error = %e, "health statistics refresh failed");
            }
        }
        if let Err(e) = self.records.mark_stats_updated(record.id).await {
            tracing::warn!(record_id = record.id, error = %e, "could not flag statistics as updated");
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Recovery and reanalysis
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Re-enqueue records stuck in `ingested`/`extracting` for longer than
/// `grace`. Returns how many were queued.
pub async fn recovery_sweep(records: &CallRecordStore, queue: &AnalysisQueue, grace: Duration) -> usize {
    let grace = chrono::Duration::from_std(grace).unwrap_or_else(|_| chrono::Duration::zero());
    let pending = records.pending_older_than(Utc::now() - grace).await;
    let mut queued = 0;
    for record_id in pending {
        if queue.enqueue(AnalysisJob {
            record_id,
            reason: JobReason::Recovery,
        }) {
            queued += 1;
        }
    }
    if queued > 0 {
        tracing::info!(queued, "recovery sweep re-enqueued pending records");
    }
    queued
}

/// Reset a record's derived data and queue it again.
pub async fn request_reanalysis(
    records: &CallRecordStore,
    health: &HealthDataStore,
    queue: &AnalysisQueue,
    locks: &RecordLockMap,
    record_id: RecordId,
) -> Result<CallRecord> {
    let record = {
        let _permit = locks.acquire(record_id).await;
        let record = records.reset_for_reanalysis(record_id).await?;
        let removed = health.clear_record(record_id).await?;
        tracing::info!(record_id, removed, "record reset for reanalysis");
        record
    };
    queue.enqueue(AnalysisJob {
        record_id,
        reason: JobReason::Reanalysis,
    });
    Ok(record)
}
