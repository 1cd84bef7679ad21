pub mod config;

use clap::{Parser, Subcommand};

/// CareCall: scheduled check-in calls for elders and health-signal
/// extraction from their transcripts.
#[derive(Debug, Parser)]
#[command(name = "carecall", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Run one scheduler tick against the current state and print the report.
    Tick,
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
    /// Store an API key in the OS keychain for a provider.
    SetSecret {
        /// Provider ID from config.toml.
        provider_id: String,
    },
    /// Read and display (masked) an API key from the OS keychain.
    GetSecret {
        /// Provider ID from config.toml.
        provider_id: String,
    },
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `CC_CONFIG` (or `config.toml`
/// by default). A missing file yields the defaults. Returns the parsed
/// [`Config`](cc_domain::config::Config) and the path that was used.
pub fn load_config() -> anyhow::Result<(cc_domain::config::Config, String)> {
    let config_path = std::env::var("CC_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(config_path: &str) -> anyhow::Result<cc_domain::config::Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(cc_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}
