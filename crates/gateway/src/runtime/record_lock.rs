//! Per-record concurrency control for the analysis pipeline.
//!
//! Jobs are delivered at least once (webhook enqueue, recovery sweep,
//! manual reanalysis), so two workers can pick up the same record. Each
//! record id maps to a `Semaphore(1)`; the second run waits and then sees
//! the terminal stage left by the first.

use std::collections::HashMap;
use std::sync::Arc;

use cc_domain::record::RecordId;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Default)]
pub struct RecordLockMap {
    locks: Mutex<HashMap<RecordId, Arc<Semaphore>>>,
}

impl RecordLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `record_id`. The permit releases on drop.
    pub async fn acquire(&self, record_id: RecordId) -> OwnedSemaphorePermit {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(record_id)
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        loop {
            match sem.clone().acquire_owned().await {
                Ok(permit) => return permit,
                // The semaphore is never closed; retry rather than panic.
                Err(_) => tokio::task::yield_now().await,
            }
        }
    }

    #[cfg(test)]
    fn record_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Forget locks nobody references. A caller that has looked up a
    /// semaphore but not yet acquired it still holds a clone, so its entry
    /// stays and later callers queue behind it.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1);
    }
}
