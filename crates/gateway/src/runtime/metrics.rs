//! Per-run pipeline counters.

use std::time::{Duration, Instant};

use cc_domain::record::RecordId;

/// Counts the work one pipeline run did. Passed `&mut` through every step
/// and logged once when the run ends.
#[derive(Debug)]
pub struct PipelineMetrics {
    pub record_id: RecordId,
    pub llm_calls: u32,
    pub llm_failures: u32,
    pub llm_latency: Duration,
    pub store_writes: u32,
    pub store_failures: u32,
    started: Instant,
}

impl PipelineMetrics {
    pub fn start(record_id: RecordId) -> Self {
        Self {
            record_id,
            llm_calls: 0,
            llm_failures: 0,
            llm_latency: Duration::ZERO,
            store_writes: 0,
            store_failures: 0,
            started: Instant::now(),
        }
    }

    pub fn llm_call(&mut self, elapsed: Duration, ok: bool) {
        self.llm_calls += 1;
        self.llm_latency += elapsed;
        if !ok {
            self.llm_failures += 1;
        }
    }

    pub fn store_write(&mut self, ok: bool) {
        self.store_writes += 1;
        if !ok {
            self.store_failures += 1;
        }
    }

    pub fn finish(&self, outcome: &str) {
        tracing::info!(
            record_id = self.record_id,
            outcome,
            llm_calls = self.llm_calls,
            llm_failures = self.llm_failures,
            llm_latency_ms = self.llm_latency.as_millis() as u64,
            store_writes = self.store_writes,
            store_failures = self.store_failures,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "analysis pipeline finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut m = PipelineMetrics::start(3);
        m.llm_call(Duration::from_millis(120), false);
        m.llm_call(Duration::from_millis(80), true);
        m.store_write(true);
        m.store_write(false);
        assert_eq!(m.llm_calls, 2);
        assert_eq!(m.llm_failures, 1);
        assert_eq!(m.llm_latency, Duration::from_millis(200));
        assert_eq!((m.store_writes, m.store_failures), (2, 1));
    }
}
