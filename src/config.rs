//! Process configuration loaded from the environment.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `GOOGLE_API_KEY`, `GOOGLE_API_KEY_BACKUP` — Gemini credentials, tried in order
//! - `OPENROUTER_API_KEY` — OpenRouter credential
//! - `GEMINI_BASE_URL`, `OPENROUTER_BASE_URL` — provider endpoints
//! - `PROVIDER_CALL_TIMEOUT_SECS` — per-call timeout (default: 15)
//! - `CASCADE_DEADLINE_SECS` — bound on a whole cascade run (default: 60)
//! - `ENABLE_MOCK_FALLBACK` — return the mock response when every provider fails (default: true)
//! - `KNOWLEDGE_BASE_PATH` — directory of `*.md` retrieval documents
//! - `MAX_WORKFLOW_INSTANCES`, `MAX_RECOMMENDATIONS` — in-memory capacity limits
//! - `WORKFLOW_TEMPLATES_PATH` — optional YAML file of extra workflow templates

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the whole orchestration runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Google API keys in rotation order.
    #[serde(default)]
    pub google_api_keys: Vec<String>,
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_openrouter_base_url")]
    pub openrouter_base_url: String,
    #[serde(default = "default_call_timeout_secs")]
    pub provider_call_timeout_secs: u64,
    #[serde(default = "default_cascade_deadline_secs")]
    pub cascade_deadline_secs: u64,
    #[serde(default = "default_true")]
    pub enable_mock_fallback: bool,
    #[serde(default = "default_knowledge_base_path")]
    pub knowledge_base_path: String,
    #[serde(default = "default_max_workflow_instances")]
    pub max_workflow_instances: usize,
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
    #[serde(default)]
    pub workflow_templates_path: Option<String>,
}

fn default_port() -> u16 { 8080 }
fn default_gemini_base_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_openrouter_base_url() -> String { "https://openrouter.ai/api/v1".to_string() }
fn default_call_timeout_secs() -> u64 { 15 }
fn default_cascade_deadline_secs() -> u64 { 60 }
fn default_true() -> bool { true }
fn default_knowledge_base_path() -> String { "data/knowledge_base".to_string() }
fn default_max_workflow_instances() -> usize { 1000 }
fn default_max_recommendations() -> usize { 5000 }

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: default_port(),
            google_api_keys: Vec::new(),
            openrouter_api_key: None,
            gemini_base_url: default_gemini_base_url(),
            openrouter_base_url: default_openrouter_base_url(),
            provider_call_timeout_secs: default_call_timeout_secs(),
            cascade_deadline_secs: default_cascade_deadline_secs(),
            enable_mock_fallback: true,
            knowledge_base_path: default_knowledge_base_path(),
            max_workflow_instances: default_max_workflow_instances(),
            max_recommendations: default_max_recommendations(),
            workflow_templates_path: None,
        }
    }
}

impl Settings {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let google_api_keys = ["GOOGLE_API_KEY", "GOOGLE_API_KEY_BACKUP"]
            .iter()
            .filter_map(|name| non_empty_var(name))
            .collect::<Vec<_>>();
        if google_api_keys.is_empty() {
            log::warn!("No GOOGLE_API_KEY configured; Gemini candidates will be skipped");
        }

        let openrouter_api_key = non_empty_var("OPENROUTER_API_KEY");
        if openrouter_api_key.is_none() {
            log::warn!("OPENROUTER_API_KEY not configured; OpenRouter candidates will be skipped");
        }

        Self {
            port: parsed_var("PORT").unwrap_or(defaults.port),
            google_api_keys,
            openrouter_api_key,
            gemini_base_url: non_empty_var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            openrouter_base_url: non_empty_var("OPENROUTER_BASE_URL")
                .unwrap_or(defaults.openrouter_base_url),
            provider_call_timeout_secs: parsed_var("PROVIDER_CALL_TIMEOUT_SECS")
                .unwrap_or(defaults.provider_call_timeout_secs),
            cascade_deadline_secs: parsed_var("CASCADE_DEADLINE_SECS")
                .unwrap_or(defaults.cascade_deadline_secs),
            enable_mock_fallback: non_empty_var("ENABLE_MOCK_FALLBACK")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.enable_mock_fallback),
            knowledge_base_path: non_empty_var("KNOWLEDGE_BASE_PATH")
                .unwrap_or(defaults.knowledge_base_path),
            max_workflow_instances: parsed_var("MAX_WORKFLOW_INSTANCES")
                .unwrap_or(defaults.max_workflow_instances),
            max_recommendations: parsed_var("MAX_RECOMMENDATIONS")
                .unwrap_or(defaults.max_recommendations),
            workflow_templates_path: non_empty_var("WORKFLOW_TEMPLATES_PATH"),
        }
    }

    pub fn provider_call_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_call_timeout_secs)
    }

    pub fn cascade_deadline(&self) -> Duration {
        Duration::from_secs(self.cascade_deadline_secs)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = non_empty_var(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring unparsable {}={:?}", name, raw);
            None
        }
    }
}

/// Only the literal `true` (any case) enables a flag.
fn parse_flag(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}
