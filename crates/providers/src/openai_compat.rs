//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, Azure OpenAI, Ollama, vLLM and any other endpoint that
//! follows the chat completions contract.

use crate::credentials::provider_api_key;
use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use cc_domain::chat::{Message, Usage};
use cc_domain::config::{ProviderConfig, ProviderKind};
use cc_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const AZURE_API_VERSION: &str = "2024-10-21";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM provider adapter for any OpenAI-compatible API endpoint.
///
/// Azure OpenAI shares the wire format but puts the deployment in the URL
/// (`/openai/deployments/{model}/chat/completions`) and authenticates with
/// an `api-key` header.
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    /// `(header, value)`; `None` for unauthenticated local endpoints.
    auth: Option<(String, String)>,
    default_model: String,
    client: reqwest::Client,
    is_azure: bool,
}

impl OpenAiCompatProvider {
    /// Create a provider from its config entry. The API key is resolved
    /// eagerly so a missing credential fails at startup, not mid-pipeline.
    pub fn from_config(cfg: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let is_azure = cfg.kind == ProviderKind::AzureOpenai;

        let auth = provider_api_key(cfg)?.map(|key| {
            let (default_header, default_prefix) = if is_azure {
                ("api-key", "")
            } else {
                ("Authorization", "Bearer ")
            };
            let header = cfg.auth.header.clone().unwrap_or_else(|| default_header.into());
            let prefix = cfg.auth.prefix.as_deref().unwrap_or(default_prefix);
            (header, format!("{prefix}{key}"))
        });

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            auth,
            default_model: cfg.default_model.clone().unwrap_or_else(|| "gpt-4o-mini".into()),
            client,
            is_azure,
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(url).header("Content-Type", "application/json");
        match &self.auth {
            Some((header, value)) => builder.header(header.as_str(), value.as_str()),
            None => builder,
        }
    }

    fn effective_model(&self, req: &ChatRequest) -> String {
        req.model.clone().unwrap_or_else(|| self.default_model.clone())
    }

    fn chat_url(&self, req: &ChatRequest) -> String {
        if self.is_azure {
            format!(
                "{}/openai/deployments/{}/chat/completions?api-version={AZURE_API_VERSION}",
                self.base_url,
                self.effective_model(req)
            )
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    fn build_chat_body<'a>(&self, req: &'a ChatRequest) -> ChatBody<'a> {
        ChatBody {
            // Azure carries the deployment in the URL instead.
            model: (!self.is_azure).then(|| self.effective_model(req)),
            messages: &req.messages,
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            response_format: req.json_mode.then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn parse_chat_response(provider: &str, body: &str) -> Result<ChatResponse> {
    let completion: ChatCompletion = serde_json::from_str(body)?;
    let provider_error = |message: &str| Error::Provider {
        provider: provider.into(),
        message: message.into(),
    };

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| provider_error("no choices in response"))?;
    let message = choice.message.ok_or_else(|| provider_error("no message in choice"))?;

    Ok(ChatResponse {
        content: message.content.unwrap_or_default(),
        usage: completion.usage,
        model: completion.model.unwrap_or_else(|| "unknown".into()),
        finish_reason: choice.finish_reason,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let url = self.chat_url(req);
        let body = self.build_chat_body(req);

        tracing::debug!(provider = %self.id, url = %url, "openai_compat chat request");

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        parse_chat_response(&self.id, &resp_text)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_domain::config::AuthConfig;

    fn provider(kind: ProviderKind) -> OpenAiCompatProvider {
        let cfg = ProviderConfig {
            id: "test".into(),
            kind,
            base_url: "https://llm.example/v1/".into(),
            auth: AuthConfig {
                key: Some("sk-test".into()),
                ..Default::default()
            },
            default_model: Some("gpt-4o-mini".into()),
        };
        OpenAiCompatProvider::from_config(&cfg, Duration::from_secs(5)).unwrap()
    }

    fn extraction_request() -> ChatRequest {
        ChatRequest {
            messages: vec![Message::system("extract"), Message::user("transcript")],
            temperature: Some(0.1),
            json_mode: true,
            ..Default::default()
        }
    }

    #[test]
    fn body_carries_model_temperature_and_json_mode() {
        let p = provider(ProviderKind::OpenaiCompat);
        let req = extraction_request();
        let body = serde_json::to_value(p.build_chat_body(&req)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "transcript");
        assert!(body.get("max_tokens").is_none());
        assert_eq!(p.chat_url(&extraction_request()), "https://llm.example/v1/chat/completions");
    }

    #[test]
    fn azure_moves_model_into_url() {
        let p = provider(ProviderKind::AzureOpenai);
        let req = ChatRequest {
            model: Some("care-deploy".into()),
            ..extraction_request()
        };
        let body = serde_json::to_value(p.build_chat_body(&req)).unwrap();
        assert!(body.get("model").is_none());
        assert_eq!(
            p.chat_url(&req),
            "https://llm.example/v1/openai/deployments/care-deploy/chat/completions?api-version=2024-10-21"
        );
        assert_eq!(p.auth.as_ref().map(|(h, _)| h.as_str()), Some("api-key"));
    }

    #[test]
    fn parses_content_usage_and_model() {
        let body = serde_json::json!({
            "model": "gpt-4o-mini-2024",
            "choices": [{"message": {"role": "assistant", "content": "{\"date\":null}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14, "prompt_tokens_details": {}}
        });
        let resp = parse_chat_response("test", &body.to_string()).unwrap();
        assert_eq!(resp.content, "{\"date\":null}");
        assert_eq!(resp.model, "gpt-4o-mini-2024");
        assert_eq!(resp.usage.map(|u| u.total_tokens), Some(14));
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn missing_choices_is_provider_error() {
        let err = parse_chat_response("test", r#"{"error": "x"}"#).unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));

        let err = parse_chat_response("test", "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
