//! AppState construction and background-task spawning extracted from `main.rs`.
//!
//! `serve` and the one-shot `tick` command share [`build_app_state`];
//! only `serve` calls [`spawn_background_tasks`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sha2::{Digest, Sha256};

use cc_domain::config::{Config, ConfigSeverity};
use cc_providers::ProviderRegistry;

use crate::runtime::analysis::queue::{spawn_worker, AnalysisQueue};
use crate::runtime::analysis::{recovery_sweep, AnalysisPipeline, PipelineStores};
use crate::runtime::dispatch::{CallDispatcher, HttpTelephonyClient, TelephonyClient};
use crate::runtime::ingest::CompletionIngester;
use crate::runtime::record_lock::RecordLockMap;
use crate::runtime::scheduler::CallScheduler;
use crate::runtime::stats::RollingStatistics;
use crate::state::AppState;
use crate::store::{CallRecordStore, ElderDirectory, HealthDataStore, SchedulerCursor};

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── LLM providers ────────────────────────────────────────────────
    let llm = Arc::new(
        ProviderRegistry::from_config(&config.llm).context("initializing LLM providers")?,
    );
    if llm.is_empty() {
        tracing::info!("no LLM providers initialized; transcripts will be marked extraction_failed");
    } else {
        tracing::info!(providers = llm.len(), "LLM provider registry ready");
    }

    // ── Telephony ────────────────────────────────────────────────────
    let telephony: Arc<dyn TelephonyClient> = Arc::new(
        HttpTelephonyClient::from_config(&config.telephony).context("initializing telephony client")?,
    );

    assemble_app_state(config, llm, telephony).await
}

/// Wire the stores and runtime around an existing provider registry and
/// telephony client.
pub async fn assemble_app_state(
    config: Arc<Config>,
    llm: Arc<ProviderRegistry>,
    telephony: Arc<dyn TelephonyClient>,
) -> anyhow::Result<AppState> {
    let tz = config.scheduler.tz().context("scheduler.timezone")?;
    let state_path = config.storage.state_path.clone();

    // ── Stores ───────────────────────────────────────────────────────
    let directory = Arc::new(
        ElderDirectory::open(&state_path)
            .await
            .context("opening elder directory")?,
    );
    let records = Arc::new(
        CallRecordStore::open(&state_path)
            .await
            .context("opening call record store")?,
    );
    let health = Arc::new(
        HealthDataStore::open(&state_path)
            .await
            .context("opening health data store")?,
    );
    let stats = Arc::new(
        RollingStatistics::open(&state_path, records.clone(), health.clone(), directory.clone())
            .context("opening statistics store")?,
    );
    tracing::info!(path = %state_path.display(), "stores ready");

    // ── Outbound calls ───────────────────────────────────────────────
    let dispatcher = Arc::new(
        CallDispatcher::new(directory.clone(), telephony, &config.prompts, &config.telephony)
            .context("initializing call dispatcher")?,
    );
    let cursor = Arc::new(SchedulerCursor::open(&state_path).context("opening scheduler cursor")?);
    let scheduler = Arc::new(
        CallScheduler::new(&config.scheduler, directory.clone(), dispatcher.clone(), cursor)
            .context("initializing scheduler")?,
    );
    tracing::info!(
        enabled = config.scheduler.enabled,
        interval_secs = config.scheduler.interval_secs,
        timezone = %tz,
        "call scheduler ready"
    );

    // ── Analysis ─────────────────────────────────────────────────────
    let queue = Arc::new(AnalysisQueue::new(config.analysis.queue_capacity));
    let record_locks = Arc::new(RecordLockMap::new());
    let pipeline = Arc::new(AnalysisPipeline::new(
        PipelineStores {
            records: records.clone(),
            directory: directory.clone(),
            sink: health.clone(),
            stats: stats.clone(),
        },
        llm.clone(),
        record_locks.clone(),
        config.analysis.clone(),
        &config.telephony.user_agent,
    ));
    let ingester = Arc::new(CompletionIngester::new(
        directory.clone(),
        records.clone(),
        queue.clone(),
        tz,
    ));
    tracing::info!(
        queue_capacity = config.analysis.queue_capacity,
        workers = config.analysis.worker_concurrency,
        alert_hook = config.analysis.alert_webhook_url.is_some(),
        "analysis pipeline ready"
    );

    // ── API token (read once, hash for constant-time comparison) ────
    // Priority: config.server.api_token > env var (config.server.api_token_env)
    let api_token_hash = {
        let env_var = &config.server.api_token_env;
        let token = config
            .server
            .api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| ("config".to_string(), t.to_string()))
            .or_else(|| read_env(env_var).map(|t| (format!("env:{env_var}"), t)));
        match token {
            Some((source, t)) => {
                tracing::info!(source = %source, "API bearer-token auth enabled");
                Some(Sha256::digest(t.as_bytes()).to_vec())
            }
            None => {
                tracing::warn!(
                    "API bearer-token auth DISABLED, set server.api_token in config.toml or {env_var} env var"
                );
                None
            }
        }
    };

    // ── Call-data signing secret ─────────────────────────────────────
    let call_data_secret = {
        let env_var = &config.server.call_data_secret_env;
        let secret = read_env(env_var).map(String::into_bytes);
        if secret.is_some() {
            tracing::info!(env = %env_var, "call-data signature verification enabled");
        }
        secret
    };

    Ok(AppState {
        config,
        llm,
        directory,
        records,
        health,
        stats,
        scheduler,
        dispatcher,
        ingester,
        pipeline,
        queue,
        record_locks,
        api_token_hash,
        call_data_secret,
    })
}

fn read_env(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Spawn the long-running background tokio tasks (analysis worker,
/// recovery sweep, scheduler loop, lock pruning).
///
/// Call this **after** [`build_app_state`] when running the HTTP server.
pub fn spawn_background_tasks(state: &AppState) {
    let cfg = &state.config;

    // ── Analysis worker ──────────────────────────────────────────────
    match state.queue.take_receiver() {
        Some(rx) => {
            spawn_worker(state.pipeline.clone(), rx, cfg.analysis.worker_concurrency);
            tracing::info!("analysis worker started");
        }
        None => tracing::warn!("analysis worker already running"),
    }

    // ── Recovery sweep (runs once immediately, then periodically) ────
    {
        let records = state.records.clone();
        let queue = state.queue.clone();
        let grace = Duration::from_secs(cfg.analysis.recovery_grace_secs);
        let every = Duration::from_secs(cfg.analysis.recovery_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                recovery_sweep(&records, &queue, grace).await;
            }
        });
    }

    // ── Call scheduler ───────────────────────────────────────────────
    if cfg.scheduler.enabled {
        let scheduler = state.scheduler.clone();
        tokio::spawn(async move {
            // First tick catches up from the stored cursor, later ones fire
            // just past each wall-clock boundary.
            loop {
                let ticker = scheduler.clone();
                // Detached: an overrunning tick is caught by the re-entrancy guard.
                tokio::spawn(async move {
                    if let Err(e) = ticker.tick().await {
                        tracing::error!(error = %e, "scheduler tick failed");
                    }
                });
                tokio::time::sleep(scheduler.until_next_boundary()).await;
            }
        });
        tracing::info!("scheduler loop started");
    } else {
        tracing::info!("scheduler disabled; use POST /v1/scheduler/tick or `carecall tick`");
    }

    // ── Periodic record lock pruning ─────────────────────────────────
    {
        let locks = state.record_locks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                locks.prune_idle();
            }
        });
    }
}
