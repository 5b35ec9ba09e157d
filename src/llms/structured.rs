//! Parsing of model output into a [`StructuredResponse`].
//!
//! Models are instructed to reply with a single JSON object. Many wrap it in
//! a Markdown code fence anyway, so fences are stripped before decoding.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::types::response::{ActionItem, Document, Notification, StructuredResponse, Visualization};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").expect("valid fence regex")
});

/// The JSON contract every provider reply must satisfy.
#[derive(Debug, Deserialize)]
struct Payload {
    content: String,
    #[serde(default)]
    action_items: Vec<ActionItem>,
    #[serde(default)]
    visualizations: Vec<Visualization>,
    #[serde(default)]
    documents_generated: Vec<Document>,
    #[serde(default)]
    notifications: Vec<Notification>,
    #[serde(default)]
    suggested_prompts: Vec<String>,
}

/// Remove a surrounding Markdown code fence (with or without a language tag).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match CODE_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}

/// Decode a model reply. Errors carry a short human-readable reason.
pub fn parse_structured(raw: &str, agent_name: &str) -> Result<StructuredResponse, String> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err("empty reply".to_string());
    }
    let payload: Payload = serde_json::from_str(body).map_err(|e| e.to_string())?;
    Ok(StructuredResponse {
        content: payload.content,
        action_items: payload.action_items,
        visualizations: payload.visualizations,
        documents_generated: payload.documents_generated,
        notifications: payload.notifications,
        suggested_prompts: payload.suggested_prompts,
        agent_name: agent_name.to_string(),
        ..StructuredResponse::default()
    })
}

/// System prompt sent ahead of every query.
pub fn system_prompt(persona: &str, context: &str) -> String {
    format!(
        r#"You are the {persona} Agent for an Educational Institution ERP system (AICTE/NAAC compliant).

Goal: assist the user with their request using the provided context.
Tone: professional, academic, data-driven.

Response requirements:
1. Provide role-specific recommendations based on the user's role and the query context.
2. Generate 1-3 concrete 'action_items'.
3. If the task needs input or approval from another role (Finance, HOD, Admin), add an action item 'Request [Item] from [Role]'.

Output valid JSON strictly matching this schema:
{{
  "content": "Concise conversational answer (max 3-4 sentences). Do not list actions here.",
  "action_items": [
    {{ "label": "Request Budget Approval", "action_type": "button|link|download", "variant": "primary|danger", "icon": "lucide-icon-name" }}
  ],
  "visualizations": [
    {{ "type": "pie|bar|line|mermaid", "title": "Chart Title", "data": {{ "labels": ["A", "B"], "values": [10, 20] }} }}
  ],
  "documents_generated": [
    {{ "filename": "Report.pdf", "path": "/api/v1/documents/download?file=Report.pdf", "type": "pdf" }}
  ]
}}

Context:
{context}

Rules:
1. If no obvious action exists, provide a suggested follow-up query as a button.
2. For tasks involving funds, hiring or policy, add an action to notify or request the dependency.
3. Visualizations use "pie", "bar", "line" or "mermaid" only.
4. 'content' is for explanation; 'action_items' is for execution."#
    )
}
