//! Institutional knowledge used as prompt context.
//!
//! Agents pull context through the [`KnowledgeSource`] trait. The shipped
//! implementation, [`KeywordKnowledgeBase`], scores Markdown documents by
//! keyword occurrence.

pub mod knowledge;
pub mod knowledge_config;

pub use self::knowledge::KeywordKnowledgeBase;
pub use self::knowledge_config::KnowledgeConfig;

/// Anything that can turn a query into prompt context.
pub trait KnowledgeSource: Send + Sync + std::fmt::Debug {
    /// Most relevant context for `query`; empty when nothing matches.
    fn search(&self, query: &str) -> String;
}
