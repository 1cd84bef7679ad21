use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// HTTP timeout applied to every provider request.
    #[serde(default = "d_20000u")]
    pub default_timeout_ms: u64,
    /// Startup policy for LLM providers.
    ///
    /// - `allow_none` (default): the service boots even if zero providers
    ///   init. Calls are still scheduled and ingested; analysis jobs fail
    ///   extraction until credentials are configured.
    /// - `require_one`: abort startup if no providers successfully init.
    #[serde(default)]
    pub startup_policy: LlmStartupPolicy,
    /// Model roles: `extractor`, `summarizer` (+ custom).
    #[serde(default)]
    pub roles: HashMap<String, RoleConfig>,
    /// Registered LLM providers.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 20_000,
            startup_policy: LlmStartupPolicy::AllowNone,
            roles: HashMap::new(),
            providers: Vec::new(),
        }
    }
}

/// Controls how the service handles LLM provider initialization at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmStartupPolicy {
    #[default]
    AllowNone,
    RequireOne,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Format: "provider_id/model_name"
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenaiCompat,
    AzureOpenai,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Header name (e.g. "Authorization", "api-key").
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix (e.g. "Bearer ").
    #[serde(default)]
    pub prefix: Option<String>,
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer env or keychain).
    #[serde(default)]
    pub key: Option<String>,
    /// Keychain service name (e.g., "carecall").
    #[serde(default)]
    pub service: Option<String>,
    /// Keychain account name (e.g., "openai-api-key").
    #[serde(default)]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    ApiKey,
    Keychain,
    None,
}

fn d_20000u() -> u64 {
    20_000
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_config_default_is_empty_and_lenient() {
        let config = LlmConfig::default();
        assert!(config.providers.is_empty());
        assert!(config.roles.is_empty());
        assert_eq!(config.startup_policy, LlmStartupPolicy::AllowNone);
    }

    #[test]
    fn llm_config_parses_roles_and_providers() {
        let toml_str = r#"
            startup_policy = "require_one"

            [roles.extractor]
            model = "openai/gpt-4o-mini"

            [[providers]]
            id = "openai"
            kind = "openai_compat"
            base_url = "https://api.openai.com/v1"
            auth = { mode = "api_key", env = "OPENAI_API_KEY" }
        "#;
        let config: LlmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.startup_policy, LlmStartupPolicy::RequireOne);
        assert_eq!(config.roles["extractor"].model, "openai/gpt-4o-mini");
        assert_eq!(config.providers[0].kind, ProviderKind::OpenaiCompat);
        assert_eq!(config.providers[0].auth.env.as_deref(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn unknown_provider_kind_is_rejected() {
        let toml_str = r#"
            [[providers]]
            id = "x"
            kind = "carrier_pigeon"
            base_url = "http://localhost"
        "#;
        assert!(toml::from_str::<LlmConfig>(toml_str).is_err());
    }
}
