use std::sync::Arc;

use cc_domain::config::Config;
use cc_providers::ProviderRegistry;

use crate::runtime::analysis::queue::AnalysisQueue;
use crate::runtime::analysis::AnalysisPipeline;
use crate::runtime::dispatch::CallDispatcher;
use crate::runtime::ingest::CompletionIngester;
use crate::runtime::record_lock::RecordLockMap;
use crate::runtime::scheduler::CallScheduler;
use crate::runtime::stats::RollingStatistics;
use crate::store::{CallRecordStore, ElderDirectory, HealthDataStore};

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services**: config, LLM providers
/// - **Stores**: elders and settings, call records, health rows, rollups
/// - **Runtime**: scheduler, dispatcher, ingester, analysis pipeline
/// - **Security**: token hashes computed at startup
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,

    // ── Stores ────────────────────────────────────────────────────────
    pub directory: Arc<ElderDirectory>,
    pub records: Arc<CallRecordStore>,
    pub health: Arc<HealthDataStore>,
    pub stats: Arc<RollingStatistics>,

    // ── Runtime ───────────────────────────────────────────────────────
    pub scheduler: Arc<CallScheduler>,
    pub dispatcher: Arc<CallDispatcher>,
    pub ingester: Arc<CompletionIngester>,
    pub pipeline: Arc<AnalysisPipeline>,
    pub queue: Arc<AnalysisQueue>,
    /// Per-record locks shared by the pipeline and reanalysis requests.
    pub record_locks: Arc<RecordLockMap>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
    /// HMAC key for `X-Signature-256` on `/call-data`. `None` = unsigned.
    pub call_data_secret: Option<Vec<u8>>,
}
