//! API keys for the configured LLM providers.
//!
//! `auth.mode` picks the source:
//! - `api_key`: the inline `key`, else the `env` variable.
//! - `keychain`: the OS keychain entry `(service, account)`, defaulting to
//!   `("carecall", <provider id>)`. Hosts without a keychain daemon can
//!   export `CARECALL_<ACCOUNT>` instead.
//! - `none`: unauthenticated local endpoint.

use cc_domain::config::{AuthMode, ProviderConfig};
use cc_domain::error::{Error, Result};

/// Keychain service used when a provider's `auth.service` is unset.
pub const KEYCHAIN_SERVICE: &str = "carecall";

/// Keychain `(service, account)` under which a provider's key is stored.
pub fn keychain_entry(provider: &ProviderConfig) -> (String, String) {
    let service = provider
        .auth
        .service
        .clone()
        .unwrap_or_else(|| KEYCHAIN_SERVICE.to_owned());
    let account = provider.auth.account.clone().unwrap_or_else(|| provider.id.clone());
    (service, account)
}

/// The API key for `provider`, or `None` for `auth.mode = "none"`.
pub fn provider_api_key(provider: &ProviderConfig) -> Result<Option<String>> {
    let auth = &provider.auth;
    match auth.mode {
        AuthMode::None => Ok(None),
        AuthMode::ApiKey => {
            if let Some(key) = &auth.key {
                tracing::warn!(provider = %provider.id, "API key read from plaintext config, prefer auth.env");
                return Ok(Some(key.clone()));
            }
            let var = auth.env.as_deref().ok_or_else(|| {
                Error::Auth(format!("provider {}: auth.mode = \"api_key\" needs auth.key or auth.env", provider.id))
            })?;
            std::env::var(var)
                .map(Some)
                .map_err(|_| Error::Auth(format!("provider {}: environment variable {var} is not set", provider.id)))
        }
        AuthMode::Keychain => {
            let (service, account) = keychain_entry(provider);
            match read_keychain(&service, &account) {
                Ok(secret) => Ok(Some(secret)),
                Err(keychain_err) => {
                    let var = headless_env_name(&service, &account);
                    match std::env::var(&var) {
                        Ok(secret) => {
                            tracing::info!(provider = %provider.id, env_var = %var, "keychain unavailable, key read from env");
                            Ok(Some(secret))
                        }
                        Err(_) => Err(Error::Auth(format!(
                            "provider {}: {keychain_err}; run `carecall config set-secret {}` or export {var}",
                            provider.id, provider.id
                        ))),
                    }
                }
            }
        }
    }
}

/// Read a secret from the OS keychain.
pub fn read_keychain(service: &str, account: &str) -> Result<String> {
    keyring::Entry::new(service, account)
        .and_then(|entry| entry.get_password())
        .map_err(|e| Error::Auth(format!("keychain entry {service}/{account}: {e}")))
}

/// `("carecall", "azure-east")` → `CARECALL_AZURE_EAST`.
fn headless_env_name(service: &str, account: &str) -> String {
    format!("{service}_{account}")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_domain::config::{AuthConfig, ProviderKind};

    fn provider(id: &str, auth: AuthConfig) -> ProviderConfig {
        ProviderConfig {
            id: id.into(),
            kind: ProviderKind::OpenaiCompat,
            base_url: "http://localhost:11434/v1".into(),
            auth,
            default_model: None,
        }
    }

    #[test]
    fn keychain_entry_defaults_to_carecall_and_provider_id() {
        let p = provider("azure", AuthConfig::default());
        assert_eq!(keychain_entry(&p), ("carecall".to_owned(), "azure".to_owned()));

        let p = provider(
            "azure",
            AuthConfig {
                service: Some("ops".into()),
                account: Some("azure-east".into()),
                ..Default::default()
            },
        );
        assert_eq!(keychain_entry(&p), ("ops".to_owned(), "azure-east".to_owned()));
    }

    #[test]
    fn headless_env_name_is_upper_snake() {
        assert_eq!(headless_env_name("carecall", "azure-east"), "CARECALL_AZURE_EAST");
        assert_eq!(headless_env_name("carecall", "open.ai"), "CARECALL_OPEN_AI");
    }

    #[test]
    fn no_auth_has_no_key() {
        let p = provider(
            "local",
            AuthConfig {
                mode: AuthMode::None,
                key: Some("ignored".into()),
                ..Default::default()
            },
        );
        assert_eq!(provider_api_key(&p).unwrap(), None);
    }

    #[test]
    fn api_key_mode_prefers_inline_key_then_env() {
        let p = provider(
            "openai",
            AuthConfig {
                key: Some("sk-inline".into()),
                env: Some("CC_TEST_CREDENTIALS_NOT_READ".into()),
                ..Default::default()
            },
        );
        assert_eq!(provider_api_key(&p).unwrap().as_deref(), Some("sk-inline"));

        let var = "CC_TEST_CREDENTIALS_ENV_4411";
        std::env::set_var(var, "sk-env");
        let p = provider(
            "openai",
            AuthConfig {
                env: Some(var.into()),
                ..Default::default()
            },
        );
        assert_eq!(provider_api_key(&p).unwrap().as_deref(), Some("sk-env"));
        std::env::remove_var(var);
    }

    #[test]
    fn api_key_mode_errors_name_the_provider() {
        let err = provider_api_key(&provider("openai", AuthConfig::default())).unwrap_err();
        assert!(matches!(&err, Error::Auth(m) if m.contains("openai")));

        let p = provider(
            "openai",
            AuthConfig {
                env: Some("CC_TEST_CREDENTIALS_UNSET_9090".into()),
                ..Default::default()
            },
        );
        let err = provider_api_key(&p).unwrap_err();
        assert!(err.to_string().contains("CC_TEST_CREDENTIALS_UNSET_9090"));
    }

    #[test]
    fn keychain_mode_falls_back_to_env_on_headless_hosts() {
        // Unique account, so no real keychain entry can exist for it.
        let var = "CARECALL_CC_TEST_HEADLESS_7731";
        std::env::set_var(var, "sk-headless");
        let p = provider(
            "cc-test-headless-7731",
            AuthConfig {
                mode: AuthMode::Keychain,
                ..Default::default()
            },
        );
        assert_eq!(provider_api_key(&p).unwrap().as_deref(), Some("sk-headless"));
        std::env::remove_var(var);
    }
}
