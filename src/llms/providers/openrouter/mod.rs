//! OpenRouter provider (OpenAI-compatible `chat/completions`).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llms::base_llm::{ChatMessage, CompletionProvider, Credential, RawCompletion, TokenUsage};
use crate::llms::error::ProviderError;
use crate::llms::providers::utils::send_json;

pub const PROVIDER_NAME: &str = "openrouter";

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Attribution headers OpenRouter uses for its app rankings.
const REFERER: &str = "http://localhost:3000";
const APP_TITLE: &str = "ERP Agent";

/// OpenRouter completion provider. Models are addressed by their
/// `vendor/model[:tier]` slug.
#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    base_url: String,
    temperature: f64,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temperature: 0.3,
            client: reqwest::Client::new(),
        }
    }

    fn build_request_body(&self, model: &str, messages: &[ChatMessage]) -> Value {
        json!({
            "model": model,
            "messages": messages,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"},
        })
    }
}

/// Extract the first choice's message content and token usage.
pub fn parse_response(response: &Value) -> Result<RawCompletion, ProviderError> {
    let text = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Api {
            provider: PROVIDER_NAME.to_string(),
            message: "no choices in response".to_string(),
        })?
        .to_string();

    let usage = response.get("usage").map(|u| {
        let field = |k: &str| u.get(k).and_then(Value::as_u64).unwrap_or(0);
        TokenUsage {
            prompt_tokens: field("prompt_tokens"),
            completion_tokens: field("completion_tokens"),
            total_tokens: field("total_tokens"),
        }
    });

    Ok(RawCompletion { text, usage })
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn complete(
        &self,
        model: &str,
        credential: &Credential,
        messages: &[ChatMessage],
    ) -> Result<RawCompletion, ProviderError> {
        log::debug!(
            "OpenRouterProvider.complete: model={}, messages={}",
            model,
            messages.len()
        );
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential.secret())
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&self.build_request_body(model, messages));
        let response = send_json(PROVIDER_NAME, request).await?;
        parse_response(&response)
    }
}
