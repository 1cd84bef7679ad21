//! In-process analysis job queue and its worker.

use std::sync::Arc;

use cc_domain::record::RecordId;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};

use super::AnalysisPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobReason {
    Ingested,
    Recovery,
    Reanalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisJob {
    pub record_id: RecordId,
    pub reason: JobReason,
}

/// Bounded MPSC queue. Jobs are not durable: the record's stage is the
/// source of truth and the recovery sweep re-enqueues anything lost.
pub struct AnalysisQueue {
    tx: mpsc::Sender<AnalysisJob>,
    rx: Mutex<Option<mpsc::Receiver<AnalysisJob>>>,
}

impl AnalysisQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Queue a job without waiting. Returns `false` when the queue is full
    /// or the worker is gone; the recovery sweep picks such records up.
    pub fn enqueue(&self, job: AnalysisJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => {
                tracing::debug!(record_id = job.record_id, reason = ?job.reason, "analysis job queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(record_id = job.record_id, "analysis queue full, leaving record for recovery");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(record_id = job.record_id, "analysis worker stopped, job dropped");
                false
            }
        }
    }

    /// The receiving end. Only the first caller gets it.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<AnalysisJob>> {
        self.rx.lock().take()
    }
}

/// Drain `rx`, running at most `concurrency` pipeline runs at once.
pub fn spawn_worker(
    pipeline: Arc<AnalysisPipeline>,
    mut rx: mpsc::Receiver<AnalysisJob>,
    concurrency: usize,
) -> tokio::task::JoinHandle<()> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let permit = match permits.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = pipeline.run(job.record_id).await {
                    tracing::error!(
                        record_id = job.record_id,
                        reason = ?job.reason,
                        error = %e,
                        "analysis run failed"
                    );
                }
            });
        }
        tracing::info!("analysis worker stopped");
    })
}
