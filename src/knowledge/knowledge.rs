//! Keyword-scored Markdown knowledge base.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::knowledge_config::KnowledgeConfig;
use super::KnowledgeSource;

/// In-memory set of Markdown documents keyed by file name.
///
/// A document's score for a query is the total number of occurrences of the
/// query's words in its lowercased text. Documents scoring zero are never
/// returned. Equal scores keep file-name order.
#[derive(Debug, Clone, Default)]
pub struct KeywordKnowledgeBase {
    documents: BTreeMap<String, String>,
    config: KnowledgeConfig,
}

impl KeywordKnowledgeBase {
    pub fn new(config: KnowledgeConfig) -> Self {
        Self {
            documents: BTreeMap::new(),
            config,
        }
    }

    /// Load every `*.md` file directly under `dir`. A missing directory
    /// yields an empty knowledge base.
    pub fn load(dir: impl AsRef<Path>, config: KnowledgeConfig) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut kb = Self::new(config);
        if !dir.is_dir() {
            log::warn!("Knowledge base path {} does not exist", dir.display());
            return Ok(kb);
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path)?;
            kb.documents.insert(name.to_string(), content);
        }
        log::info!("Loaded {} documents into the knowledge base", kb.documents.len());
        Ok(kb)
    }

    /// Add or replace a document.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.documents.insert(name.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl KnowledgeSource for KeywordKnowledgeBase {
    fn search(&self, query: &str) -> String {
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            return String::new();
        }

        let mut scored: Vec<(usize, &str)> = self
            .documents
            .values()
            .filter_map(|content| {
                let lower = content.to_lowercase();
                let score: usize = words.iter().map(|w| lower.matches(w.as_str()).count()).sum();
                (score > 0).then_some((score, content.as_str()))
            })
            .collect();
        // Stable sort keeps file-name order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(self.config.results_limit)
            .map(|(_, content)| content)
            .collect::<Vec<_>>()
            .join(&self.config.separator)
    }
}
