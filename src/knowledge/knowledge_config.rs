//! Retrieval settings for the knowledge base.

use serde::{Deserialize, Serialize};

/// Controls how many documents a query returns and how they are joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Maximum number of documents returned per query. Defaults to 3.
    #[serde(default = "default_results_limit")]
    pub results_limit: usize,

    /// Separator placed between returned documents.
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_results_limit() -> usize {
    3
}

fn default_separator() -> String {
    "\n\n---\n\n".to_string()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            results_limit: default_results_limit(),
            separator: default_separator(),
        }
    }
}

impl KnowledgeConfig {
    pub fn new(results_limit: Option<usize>) -> Self {
        Self {
            results_limit: results_limit.unwrap_or_else(default_results_limit),
            ..Self::default()
        }
    }
}
