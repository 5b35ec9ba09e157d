//! HTTP helpers shared by the provider implementations.

use serde_json::Value;

use crate::llms::error::ProviderError;

/// Longest response body excerpt kept in an error message.
const BODY_EXCERPT_CHARS: usize = 500;

/// Send a prepared JSON request and decode the JSON reply.
///
/// Non-success statuses, undecodable bodies and provider `error` objects all
/// become a [`ProviderError`].
pub async fn send_json(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<Value, ProviderError> {
    let response = request
        .header("content-type", "application/json")
        .send()
        .await
        .map_err(|source| ProviderError::Transport {
            provider: provider.to_string(),
            source,
        })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|source| ProviderError::Transport {
            provider: provider.to_string(),
            source,
        })?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: excerpt(&text),
        });
    }

    let json: Value = serde_json::from_str(&text).map_err(|e| ProviderError::Api {
        provider: provider.to_string(),
        message: format!("undecodable response body ({}): {}", e, excerpt(&text)),
    })?;

    if let Some(error) = json.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(ProviderError::Api {
            provider: provider.to_string(),
            message,
        });
    }

    Ok(json)
}

/// First [`BODY_EXCERPT_CHARS`] characters of `text`.
pub fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT_CHARS).collect()
}
