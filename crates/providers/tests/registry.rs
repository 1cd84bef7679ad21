//! Registry construction and role resolution, without network access.

use cc_domain::config::{AuthConfig, LlmConfig, LlmStartupPolicy, ProviderConfig, ProviderKind, RoleConfig};
use cc_domain::error::{Error, Result};
use cc_providers::{ChatRequest, ChatResponse, LlmProvider, ProviderRegistry};
use std::sync::Arc;

struct Named(&'static str);

#[async_trait::async_trait]
impl LlmProvider for Named {
    async fn chat(&self, _req: &ChatRequest) -> Result<ChatResponse> {
        Ok(ChatResponse {
            content: self.0.into(),
            usage: None,
            model: "stub".into(),
            finish_reason: Some("stop".into()),
        })
    }

    fn provider_id(&self) -> &str {
        self.0
    }
}

fn provider_cfg(id: &str, auth: AuthConfig) -> ProviderConfig {
    ProviderConfig {
        id: id.into(),
        kind: ProviderKind::OpenaiCompat,
        base_url: "http://127.0.0.1:9/v1".into(),
        auth,
        default_model: None,
    }
}

#[test]
fn roles_map_to_provider_and_model() {
    let mut config = LlmConfig::default();
    config.providers.push(provider_cfg(
        "local",
        AuthConfig {
            key: Some("sk-local".into()),
            ..Default::default()
        },
    ));
    config.roles.insert(
        "extractor".into(),
        RoleConfig {
            model: "local/qwen2.5-14b".into(),
        },
    );

    let registry = ProviderRegistry::from_config(&config).unwrap();
    assert_eq!(registry.len(), 1);

    let (provider, model) = registry.resolve_role("extractor").unwrap();
    assert_eq!(provider.provider_id(), "local");
    assert_eq!(model.as_deref(), Some("qwen2.5-14b"));
}

#[test]
fn provider_without_credentials_is_skipped() {
    let mut config = LlmConfig::default();
    config.providers.push(provider_cfg(
        "broken",
        AuthConfig {
            env: Some("CC_TEST_REGISTRY_UNSET_KEY_5150".into()),
            ..Default::default()
        },
    ));

    let registry = ProviderRegistry::from_config(&config).unwrap();
    assert!(registry.is_empty());
    assert!(registry.resolve_role("extractor").is_none());
}

#[test]
fn require_one_policy_fails_on_empty_registry() {
    let config = LlmConfig {
        startup_policy: LlmStartupPolicy::RequireOne,
        ..Default::default()
    };
    let err = ProviderRegistry::from_config(&config).err().expect("must fail");
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn unassigned_role_falls_back_to_first_provider() {
    let registry = ProviderRegistry::from_providers(
        vec![Arc::new(Named("alpha")), Arc::new(Named("beta"))],
        [("summarizer".to_string(), "beta/small".to_string())],
    );

    let (p, model) = registry.resolve_role("extractor").unwrap();
    assert_eq!(p.provider_id(), "alpha");
    assert!(model.is_none());

    let (p, model) = registry.resolve_role("summarizer").unwrap();
    assert_eq!(p.provider_id(), "beta");
    assert_eq!(model.as_deref(), Some("small"));
    assert_eq!(registry.list_providers(), vec!["alpha", "beta"]);
}

#[test]
fn role_on_missing_provider_falls_back() {
    let registry = ProviderRegistry::from_providers(
        vec![Arc::new(Named("alpha"))],
        [("extractor".to_string(), "gone/model-x".to_string())],
    );
    let (p, model) = registry.resolve_role("extractor").unwrap();
    assert_eq!(p.provider_id(), "alpha");
    assert!(model.is_none());
}
