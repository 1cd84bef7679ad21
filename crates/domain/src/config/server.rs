use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_3210")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Bearer token for protected endpoints, set directly in config.
    /// Takes precedence over `api_token_env`.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Environment variable holding the API bearer token. When neither
    /// this nor `api_token` yields a value the server runs unauthenticated
    /// and logs a warning.
    #[serde(default = "d_api_token_env")]
    pub api_token_env: String,
    /// Environment variable holding the shared secret the telephony
    /// provider signs `POST /call-data` bodies with. Signature checks are
    /// skipped when the variable is unset.
    #[serde(default = "d_call_data_secret_env")]
    pub call_data_secret_env: String,
    /// Per-IP token-bucket rate limiting. Disabled when `None`.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    /// Upper bound on in-flight HTTP requests.
    #[serde(default = "d_256")]
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3210,
            host: "127.0.0.1".into(),
            cors: CorsConfig::default(),
            api_token: None,
            api_token_env: d_api_token_env(),
            call_data_secret_env: d_call_data_secret_env(),
            rate_limit: None,
            max_concurrent_requests: 256,
        }
    }
}

/// Per-IP token-bucket rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// One token is added every `1 / requests_per_second` seconds.
    pub requests_per_second: u64,
    /// Maximum tokens in the bucket.
    pub burst_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed for CORS. `["*"]` allows everything.
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_3210() -> u16 {
    3210
}
fn d_256() -> usize {
    256
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}
fn d_api_token_env() -> String {
    "CC_API_TOKEN".into()
}
fn d_call_data_secret_env() -> String {
    "CC_CALL_DATA_SECRET".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_empty_toml_uses_all_defaults() {
        let cfg: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.port, 3210);
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.api_token_env, "CC_API_TOKEN");
        assert_eq!(cfg.call_data_secret_env, "CC_CALL_DATA_SECRET");
        assert_eq!(cfg.max_concurrent_requests, 256);
        assert!(cfg.api_token.is_none());
        assert!(cfg.rate_limit.is_none());
    }

    #[test]
    fn server_config_parses_with_rate_limit() {
        let toml_str = r#"
            port = 8080

            [rate_limit]
            requests_per_second = 50
            burst_size = 100
        "#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.port, 8080);
        let rl = cfg.rate_limit.expect("rate_limit should be Some");
        assert_eq!(rl.requests_per_second, 50);
        assert_eq!(rl.burst_size, 100);
    }
}
