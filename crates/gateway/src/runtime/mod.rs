//! Care-call runtime: the scheduler that places outbound calls, the
//! ingester that records their completions, and the analysis pipeline
//! that turns transcripts into health data.

pub mod analysis;
pub mod dispatch;
pub mod ingest;
pub mod metrics;
pub mod prompts;
pub mod record_lock;
pub mod scheduler;
pub mod stats;
pub mod window;
