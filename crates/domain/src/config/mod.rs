mod analysis;
mod llm;
mod observability;
mod prompts;
mod scheduler;
mod server;
mod storage;
mod telephony;

pub use analysis::*;
pub use llm::*;
pub use observability::*;
pub use prompts::*;
pub use scheduler::*;
pub use server::*;
pub use storage::*;
pub use telephony::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub telephony: TelephonyConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good. `serve` refuses to
    /// start while any `Error` is present; warnings are logged.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*" {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        self.validate_llm(&mut errors);

        if self.scheduler.interval_secs == 0 {
            errors.push(ConfigError::error(
                "scheduler.interval_secs",
                "interval must be greater than 0",
            ));
        } else if 86_400 % self.scheduler.interval_secs != 0 {
            errors.push(ConfigError::warning(
                "scheduler.interval_secs",
                "interval does not divide a day; tick boundaries drift across midnight",
            ));
        }
        if let Err(e) = self.scheduler.tz() {
            errors.push(ConfigError::error("scheduler.timezone", e.to_string()));
        }
        if self.scheduler.dispatch_concurrency == 0 {
            errors.push(ConfigError::error(
                "scheduler.dispatch_concurrency",
                "must be at least 1",
            ));
        }
        if self.scheduler.max_catchup_minutes > 24 * 60 {
            errors.push(ConfigError::warning(
                "scheduler.max_catchup_minutes",
                "windows are capped at 24h; larger values have no effect",
            ));
        }

        match &self.telephony.url {
            None => errors.push(ConfigError::warning(
                "telephony.url",
                "no telephony endpoint configured; outbound calls will fail",
            )),
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                errors.push(ConfigError::error("telephony.url", "must be an http(s) URL"));
            }
            Some(_) => {}
        }
        if !self.telephony.country_code.starts_with('+') {
            errors.push(ConfigError::error(
                "telephony.country_code",
                "country code must start with '+'",
            ));
        }

        if let Err(e) = regex::Regex::new(&self.prompts.diabetes_pattern) {
            errors.push(ConfigError::error("prompts.diabetes_pattern", e.to_string()));
        }

        if self.analysis.max_attempts == 0 {
            errors.push(ConfigError::error("analysis.max_attempts", "must be at least 1"));
        }
        if self.analysis.worker_concurrency == 0 {
            errors.push(ConfigError::error(
                "analysis.worker_concurrency",
                "must be at least 1",
            ));
        }
        if self.analysis.queue_capacity == 0 {
            errors.push(ConfigError::error("analysis.queue_capacity", "must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.analysis.temperature) {
            errors.push(ConfigError::warning(
                "analysis.temperature",
                "temperature outside 0.0..=2.0 is usually rejected by providers",
            ));
        }

        errors
    }

    fn validate_llm(&self, errors: &mut Vec<ConfigError>) {
        if self.llm.providers.is_empty() {
            errors.push(ConfigError::warning(
                "llm.providers",
                "no LLM providers configured; transcripts will not be analysed",
            ));
        }

        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].id"),
                    "provider id must not be empty",
                ));
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].base_url"),
                    "provider base_url must not be empty",
                ));
            }
        }

        for (role, cfg) in &self.llm.roles {
            let provider_id = cfg.model.split('/').next().unwrap_or_default();
            if !self.llm.providers.iter().any(|p| p.id == provider_id) {
                errors.push(ConfigError::warning(
                    format!("llm.roles.{role}.model"),
                    format!("provider {provider_id:?} is not configured"),
                ));
            }
        }
    }
}
