//! Provider registry.
//!
//! Instantiates every configured provider at startup and maps analysis
//! roles (`extractor`, `summarizer`) to a `provider_id/model` pair.

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use cc_domain::config::{LlmConfig, LlmStartupPolicy, ProviderKind};
use cc_domain::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds all instantiated LLM providers and role assignments.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    /// Registration order, used for the role fallback.
    order: Vec<String>,
    roles: HashMap<String, String>,
}

impl ProviderRegistry {
    /// Build the registry from [`LlmConfig`].
    ///
    /// Providers that fail to initialize (usually a missing key) are logged
    /// and skipped. With `startup_policy = "require_one"` an empty registry
    /// is an error.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.default_timeout_ms);
        let mut registry = Self::default();

        for pc in &config.providers {
            let result: Result<Arc<dyn LlmProvider>> = match pc.kind {
                ProviderKind::OpenaiCompat | ProviderKind::AzureOpenai => {
                    OpenAiCompatProvider::from_config(pc, timeout)
                        .map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
                }
            };

            match result {
                Ok(provider) => {
                    tracing::info!(provider_id = %pc.id, kind = ?pc.kind, "registered LLM provider");
                    registry.insert(provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %e,
                        "failed to initialize LLM provider, skipping"
                    );
                }
            }
        }

        if registry.is_empty() {
            if config.startup_policy == LlmStartupPolicy::RequireOne {
                return Err(Error::Config(
                    "no LLM provider initialized and startup_policy is require_one".into(),
                ));
            }
            tracing::warn!("no LLM providers initialized; transcript analysis will fail until auth is configured");
        }

        for (role_name, role_cfg) in &config.roles {
            registry.roles.insert(role_name.clone(), role_cfg.model.clone());
        }

        Ok(registry)
    }

    /// Build a registry from ready-made providers. Role specs use the same
    /// `provider_id/model` format as the config file.
    pub fn from_providers(
        providers: Vec<Arc<dyn LlmProvider>>,
        roles: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut registry = Self::default();
        for p in providers {
            registry.insert(p);
        }
        registry.roles.extend(roles);
        registry
    }

    fn insert(&mut self, provider: Arc<dyn LlmProvider>) {
        let id = provider.provider_id().to_string();
        if self.providers.insert(id.clone(), provider).is_none() {
            self.order.push(id);
        }
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Get the provider assigned to a given role. The role config stores
    /// "provider_id/model_name"; the first segment selects the provider.
    pub fn for_role(&self, role: &str) -> Option<Arc<dyn LlmProvider>> {
        let model_spec = self.roles.get(role)?;
        let provider_id = model_spec.split('/').next().unwrap_or(model_spec);
        self.providers.get(provider_id).cloned()
    }

    /// Get the full model spec assigned to a given role.
    pub fn model_for_role(&self, role: &str) -> Option<&str> {
        self.roles.get(role).map(|s| s.as_str())
    }

    /// Provider and model override for `role`.
    ///
    /// Falls back to the first registered provider (with its default
    /// model) when the role is unassigned or points at a provider that did
    /// not initialize.
    pub fn resolve_role(&self, role: &str) -> Option<(Arc<dyn LlmProvider>, Option<String>)> {
        if let Some(provider) = self.for_role(role) {
            let model = self
                .model_for_role(role)
                .and_then(|spec| spec.split_once('/'))
                .map(|(_, model)| model.to_string())
                .filter(|m| !m.is_empty());
            return Some((provider, model));
        }

        let first = self.order.first()?;
        tracing::debug!(role, provider_id = %first, "role unassigned, using first provider");
        self.providers.get(first).cloned().map(|p| (p, None))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// All registered provider IDs in registration order.
    pub fn list_providers(&self) -> Vec<String> {
        self.order.clone()
    }
}
