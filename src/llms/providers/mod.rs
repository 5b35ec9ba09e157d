//! Completion provider implementations.
//!
//! | Provider | Module | Candidate name |
//! |----------|--------|----------------|
//! | Google Gemini | [`gemini`] | `google` |
//! | OpenRouter | [`openrouter`] | `openrouter` |
//!
//! Each implements [`CompletionProvider`](crate::llms::base_llm::CompletionProvider)
//! and performs a single HTTP call; [`utils`] holds the shared request helper.

pub mod gemini;
pub mod openrouter;
pub mod utils;

pub use gemini::GeminiProvider;
pub use openrouter::OpenRouterProvider;
