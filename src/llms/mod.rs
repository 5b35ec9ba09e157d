//! Language-model access.
//!
//! - [`base_llm`]: the [`CompletionProvider`] trait and message types
//! - [`providers`]: Gemini and OpenRouter HTTP implementations
//! - [`cascade`]: ordered fallback, credential rotation and time budgets
//! - [`structured`]: prompt construction and reply parsing
//! - [`mock`]: deterministic keyword replies used as the last resort

pub mod base_llm;
pub mod cascade;
pub mod error;
pub mod mock;
pub mod providers;
pub mod structured;

pub use base_llm::{ChatMessage, CompletionProvider, Credential, RawCompletion, TokenUsage};
pub use cascade::{CallOptions, CascadeConfig, ProviderAttempt, ProviderCascade};
pub use error::{LlmError, ProviderError};
