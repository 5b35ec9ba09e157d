//! Google Gemini provider (`generateContent` REST endpoint).
//!
//! Gemini has no system role on this endpoint, so system messages are folded
//! into the first user turn.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llms::base_llm::{ChatMessage, CompletionProvider, Credential, RawCompletion, TokenUsage};
use crate::llms::error::ProviderError;
use crate::llms::providers::utils::send_json;

pub const PROVIDER_NAME: &str = "google";

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini completion provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    base_url: String,
    temperature: f64,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temperature: 0.3,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Build the `generateContent` request body.
    fn build_request_body(&self, messages: &[ChatMessage]) -> Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();

        let mut contents = Vec::new();
        let mut pending_system = if system.is_empty() {
            None
        } else {
            Some(system.join("\n\n"))
        };

        for message in messages.iter().filter(|m| m.role != "system") {
            let role = if message.role == "assistant" { "model" } else { "user" };
            let text = match pending_system.take() {
                Some(prefix) if role == "user" => format!("{}\n\n{}", prefix, message.content),
                Some(prefix) => {
                    contents.push(json!({"role": "user", "parts": [{"text": prefix}]}));
                    message.content.clone()
                }
                None => message.content.clone(),
            };
            contents.push(json!({"role": role, "parts": [{"text": text}]}));
        }
        if let Some(prefix) = pending_system {
            contents.push(json!({"role": "user", "parts": [{"text": prefix}]}));
        }

        json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.temperature,
                "responseMimeType": "application/json",
            }
        })
    }
}

/// Extract the joined candidate text and token usage from a reply.
pub fn parse_response(response: &Value) -> Result<RawCompletion, ProviderError> {
    let parts = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Api {
            provider: PROVIDER_NAME.to_string(),
            message: "no candidates in response".to_string(),
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    let usage = response.get("usageMetadata").map(|u| {
        let prompt = u.get("promptTokenCount").and_then(Value::as_u64).unwrap_or(0);
        let completion = u
            .get("candidatesTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: u
                .get("totalTokenCount")
                .and_then(Value::as_u64)
                .unwrap_or(prompt + completion),
        }
    });

    Ok(RawCompletion { text, usage })
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
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
            "GeminiProvider.complete: model={}, credential={}, messages={}",
            model,
            credential.label(),
            messages.len()
        );
        let request = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", credential.secret())])
            .json(&self.build_request_body(messages));
        let response = send_json(PROVIDER_NAME, request).await?;
        parse_response(&response)
    }
}
