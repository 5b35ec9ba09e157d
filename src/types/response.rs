//! Structured agent response.
//!
//! Every agent, the provider cascade and the mock generator return the same
//! shape so the front end can render content, action chips, charts,
//! downloadable documents and bell notifications uniformly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Clickable action rendered as a chip or button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    /// Display text.
    pub label: String,
    /// `button`, `link`, `chip`, `download`, `modal` or `workflow_start`.
    pub action_type: String,
    /// Data the front end sends back when the action is triggered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Icon name (lucide-react).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// `primary`, `secondary` or `danger`.
    #[serde(default = "default_variant")]
    pub variant: String,
}

fn default_variant() -> String {
    "primary".to_string()
}

impl ActionItem {
    pub fn new(label: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action_type: action_type.into(),
            payload: None,
            icon: None,
            variant: default_variant(),
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Chart or diagram rendered inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    /// `pie`, `bar`, `line`, `table` or `mermaid`.
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

impl Visualization {
    pub fn new(kind: impl Into<String>, title: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            data,
            config: None,
        }
    }
}

/// Metadata of a generated, downloadable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    pub path: String,
    /// `pdf`, `docx`, `xlsx` or `csv`.
    #[serde(rename = "type", default = "default_document_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_document_type() -> String {
    "pdf".to_string()
}

impl Document {
    /// A PDF served by the document download endpoint.
    pub fn pdf(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            path: format!("/api/v1/documents/download?file={filename}"),
            filename,
            kind: default_document_type(),
            size_bytes: None,
            created_at: Utc::now(),
        }
    }
}

/// Alert shown under the bell icon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    /// `success`, `info`, `warning` or `error`.
    #[serde(rename = "type", default = "default_notification_type")]
    pub kind: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionItem>,
}

fn default_notification_type() -> String {
    "info".to_string()
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind: kind.into(),
            timestamp: Utc::now(),
            action: None,
        }
    }
}

/// Standardized response returned by every agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    /// Main response text (Markdown).
    pub content: String,
    /// Provider, model, token usage and other internal state.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub visualizations: Vec<Visualization>,
    #[serde(default)]
    pub documents_generated: Vec<Document>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub suggested_prompts: Vec<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub approval_from: Option<String>,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    /// Seconds spent producing the response.
    #[serde(default)]
    pub processing_time: f64,
}

fn default_true() -> bool {
    true
}

fn default_agent_name() -> String {
    "System".to_string()
}

impl Default for StructuredResponse {
    fn default() -> Self {
        Self {
            content: String::new(),
            metadata: Map::new(),
            action_items: Vec::new(),
            visualizations: Vec::new(),
            documents_generated: Vec::new(),
            notifications: Vec::new(),
            suggested_prompts: Vec::new(),
            requires_approval: false,
            approval_from: None,
            success: true,
            error_message: None,
            agent_name: default_agent_name(),
            processing_time: 0.0,
        }
    }
}

impl StructuredResponse {
    /// A successful response carrying only text.
    pub fn text(agent_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            agent_name: agent_name.into(),
            ..Self::default()
        }
    }

    /// A `success: false` response used instead of surfacing a bare server error.
    pub fn failure(agent_name: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            content: format!(
                "**System Error**: An internal error occurred while processing your request.\n\n`{message}`"
            ),
            success: false,
            error_message: Some(message),
            agent_name: agent_name.into(),
            ..Self::default()
        }
    }

    /// Insert a metadata entry, replacing any previous value.
    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let resp: StructuredResponse =
            serde_json::from_value(json!({"content": "hello"})).unwrap();
        assert_eq!(resp.content, "hello");
        assert!(resp.success);
        assert_eq!(resp.agent_name, "System");
        assert!(resp.action_items.is_empty());
    }

    #[test]
    fn test_action_item_variant_defaults_to_primary() {
        let item: ActionItem =
            serde_json::from_value(json!({"label": "Go", "action_type": "button"})).unwrap();
        assert_eq!(item.variant, "primary");
        assert!(item.payload.is_none());
    }

    #[test]
    fn test_failure_carries_message() {
        let resp = StructuredResponse::failure("System", "boom");
        assert!(!resp.success);
        assert_eq!(resp.error_message.as_deref(), Some("boom"));
        assert!(resp.content.contains("boom"));
    }

    #[test]
    fn test_visualization_serializes_type_field() {
        let viz = Visualization::new("bar", "Chart", json!({"values": [1, 2]}));
        let value = serde_json::to_value(&viz).unwrap();
        assert_eq!(value["type"], "bar");
        assert!(value.get("config").is_none());
    }
}
