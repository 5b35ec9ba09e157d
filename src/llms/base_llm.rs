//! Provider abstraction shared by every completion backend.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ProviderError;

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Rough estimate (four characters per token) for providers that report nothing.
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        let prompt_tokens = (prompt.len() / 4) as u64;
        let completion_tokens = (completion.len() / 4) as u64;
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Raw text returned by a provider before contract parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCompletion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// An API key with a display label. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    label: String,
    secret: String,
}

impl Credential {
    pub fn new(label: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            secret: secret.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({}, ****)", self.label)
    }
}

/// A remote chat-completion backend.
///
/// Implementations issue exactly one request per call and never retry; the
/// cascade owns retry, rotation and timeout policy.
#[async_trait]
pub trait CompletionProvider: Send + Sync + fmt::Debug {
    /// Provider name referenced by cascade candidates, e.g. `google`.
    fn name(&self) -> &str;

    async fn complete(
        &self,
        model: &str,
        credential: &Credential,
        messages: &[ChatMessage],
    ) -> Result<RawCompletion, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_hides_secret() {
        let cred = Credential::new("google#1", "sk-very-secret");
        let printed = format!("{:?}", cred);
        assert!(printed.contains("google#1"));
        assert!(!printed.contains("sk-very-secret"));
    }

    #[test]
    fn test_token_estimate() {
        let usage = TokenUsage::estimate("abcdefgh", "abcd");
        assert_eq!(usage.prompt_tokens, 2);
        assert_eq!(usage.completion_tokens, 1);
        assert_eq!(usage.total_tokens, 3);
    }
}
