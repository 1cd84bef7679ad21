//! Outbound call dispatch to the telephony service.
//!
//! A dispatch re-reads the elder and setting, renders the slot's prompt,
//! normalizes the phone number and POSTs the call request. Failures are
//! logged and counted, never retried: the next scheduled slot is the
//! retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cc_domain::care::{ElderId, SettingId};
use cc_domain::config::{PromptsConfig, TelephonyConfig};
use cc_domain::error::{Error, Result};
use cc_domain::phone::normalize_phone_number;
use futures_util::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::runtime::prompts::{CallStrategy, PromptContext};
use crate::runtime::window::DueCall;
use crate::store::ElderDirectory;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Telephony client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Request body sent to the telephony endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundCall {
    pub elder_id: ElderId,
    pub setting_id: SettingId,
    /// E.164.
    pub phone_number: String,
    pub prompt: String,
}

#[async_trait]
pub trait TelephonyClient: Send + Sync {
    async fn place_call(&self, call: &OutboundCall) -> Result<()>;
}

pub struct HttpTelephonyClient {
    url: Option<String>,
    client: reqwest::Client,
}

impl HttpTelephonyClient {
    pub fn from_config(cfg: &TelephonyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.as_str())
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            url: cfg.url.clone(),
            client,
        })
    }
}

#[async_trait]
impl TelephonyClient for HttpTelephonyClient {
    async fn place_call(&self, call: &OutboundCall) -> Result<()> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| Error::ExternalCall("telephony.url is not configured".into()))?;

        let resp = self
            .client
            .post(url)
            .json(call)
            .send()
            .await
            .map_err(|e| Error::ExternalCall(format!("POST {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::ExternalCall(format!("HTTP {} - {body}", status.as_u16())));
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatcher
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
    pub not_found: usize,
}

pub struct CallDispatcher {
    directory: Arc<ElderDirectory>,
    telephony: Arc<dyn TelephonyClient>,
    diabetes: Regex,
    fallback_name: String,
    country_code: String,
}

impl CallDispatcher {
    pub fn new(
        directory: Arc<ElderDirectory>,
        telephony: Arc<dyn TelephonyClient>,
        prompts: &PromptsConfig,
        telephony_cfg: &TelephonyConfig,
    ) -> Result<Self> {
        let diabetes = Regex::new(&prompts.diabetes_pattern)
            .map_err(|e| Error::Config(format!("prompts.diabetes_pattern: {e}")))?;
        Ok(Self {
            directory,
            telephony,
            diabetes,
            fallback_name: prompts.fallback_elder_name.clone(),
            country_code: telephony_cfg.country_code.clone(),
        })
    }

    /// Place the call for one due slot.
    pub async fn dispatch(&self, due: &DueCall) -> Result<()> {
        self.send(due.elder_id, due.setting_id, CallStrategy::for_slot(due.slot))
            .await
            .map(|_| ())
    }

    /// Dispatch a batch with at most `concurrency` calls in flight.
    pub async fn dispatch_all(&self, calls: Vec<DueCall>, concurrency: usize) -> DispatchSummary {
        let results: Vec<Result<()>> = stream::iter(calls)
            .map(|due| async move {
                let res = self.dispatch(&due).await;
                if let Err(e) = &res {
                    tracing::warn!(
                        elder_id = due.elder_id,
                        setting_id = due.setting_id,
                        slot = %due.slot,
                        error = %e,
                        "care call dispatch failed"
                    );
                }
                res
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut summary = DispatchSummary::default();
        for res in results {
            match res {
                Ok(()) => summary.sent += 1,
                Err(Error::NotFound(_)) => summary.not_found += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Call the elder right now with the combined script. Returns the
    /// confirmation message for the guardian.
    pub async fn dispatch_immediate(&self, elder_id: ElderId) -> Result<String> {
        let setting = self
            .directory
            .setting_for_elder(elder_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("call setting for elder {elder_id}")))?;
        let name = self.send(elder_id, setting.id, CallStrategy::Immediate).await?;
        Ok(format!("{name} 어르신께 즉시 케어콜 발송이 완료되었습니다."))
    }

    /// Render and send; returns the elder's name.
    async fn send(&self, elder_id: ElderId, setting_id: SettingId, strategy: CallStrategy) -> Result<String> {
        let profile = self
            .directory
            .profile(elder_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("elder {elder_id}")))?;
        if self.directory.setting(setting_id).await.is_none() {
            return Err(Error::NotFound(format!("call setting {setting_id}")));
        }

        let prompt = strategy.generate(&PromptContext {
            profile: &profile,
            diabetes: &self.diabetes,
            fallback_name: &self.fallback_name,
        });
        let call = OutboundCall {
            elder_id,
            setting_id,
            phone_number: normalize_phone_number(&profile.elder.phone, &self.country_code),
            prompt,
        };

        self.telephony.place_call(&call).await?;
        tracing::info!(elder_id, setting_id, strategy = ?strategy, "care call dispatched");
        Ok(profile.elder.name.trim().to_string())
    }
}
