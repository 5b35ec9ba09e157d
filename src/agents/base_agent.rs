//! The agent contract and the answer path shared by every agent.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::events::{Event, EventBus, EventType};
use crate::knowledge::KnowledgeSource;
use crate::llms::{LlmError, ProviderCascade};
use crate::types::response::StructuredResponse;

// ---------------------------------------------------------------------------
// Request context
// ---------------------------------------------------------------------------

/// Per-request caller context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentContext {
    /// Caller role, e.g. `faculty`, `hod`, `accreditation_manager`.
    #[serde(default)]
    pub role_id: Option<String>,
    /// Answer from the mock table without retrieval or provider calls.
    #[serde(default)]
    pub mock_mode: bool,
    /// Recent conversation turns, already rendered as text.
    #[serde(default)]
    pub history: String,
    /// Anything else the front end sent along.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AgentContext {
    pub fn for_role(role_id: impl Into<String>) -> Self {
        Self {
            role_id: Some(role_id.into()),
            ..Self::default()
        }
    }

    pub fn with_mock_mode(mut self, mock_mode: bool) -> Self {
        self.mock_mode = mock_mode;
        self
    }
}

// ---------------------------------------------------------------------------
// Action registry
// ---------------------------------------------------------------------------

/// A named action other components may invoke on an agent.
pub type ActionFn =
    Arc<dyn Fn(Map<String, Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Explicit action-name → handler table for one agent.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, ActionFn>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.actions.keys()).finish()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let handler: ActionFn = Arc::new(move |params| handler(params).boxed());
        self.actions.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<ActionFn> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Action names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Agent trait
// ---------------------------------------------------------------------------

/// A domain agent.
#[async_trait]
pub trait Agent: Send + Sync + fmt::Debug {
    /// Registry key, e.g. `academic`.
    fn name(&self) -> &str;

    /// Persona used in prompts, e.g. `Academic Agent`.
    fn display_name(&self) -> &str;

    /// Answer a free-text query.
    async fn handle(
        &self,
        query: &str,
        context: &AgentContext,
    ) -> Result<StructuredResponse, LlmError>;

    /// Proactive briefing shown at login.
    async fn briefing(&self) -> Result<StructuredResponse, LlmError>;

    /// Actions callable through the agent directory.
    fn actions(&self) -> &ActionRegistry;
}

// ---------------------------------------------------------------------------
// Shared services and answer path
// ---------------------------------------------------------------------------

/// Collaborators every agent uses.
#[derive(Clone)]
pub struct AgentServices {
    pub cascade: Arc<ProviderCascade>,
    pub knowledge: Arc<dyn KnowledgeSource>,
    pub bus: Arc<EventBus>,
}

impl fmt::Debug for AgentServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentServices")
            .field("candidates", &self.cascade.attempts().len())
            .finish_non_exhaustive()
    }
}

impl AgentServices {
    pub fn new(
        cascade: Arc<ProviderCascade>,
        knowledge: Arc<dyn KnowledgeSource>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            cascade,
            knowledge,
            bus,
        }
    }

    /// Retrieval-augmented answer.
    ///
    /// Mock mode short-circuits before retrieval. Otherwise the knowledge
    /// source is searched with `retrieval_query`, the caller's history is
    /// appended, the cascade is asked, and an `AgentResponse` event is
    /// published with the result.
    pub async fn answer(
        &self,
        agent_name: &str,
        persona: &str,
        query: &str,
        retrieval_query: &str,
        context: &AgentContext,
    ) -> Result<StructuredResponse, LlmError> {
        if context.mock_mode {
            log::debug!("[{}] mock mode, skipping retrieval", agent_name);
            return self.cascade.complete(persona, query, "", true).await;
        }

        let retrieved = self.knowledge.search(retrieval_query);
        let full_context = format!(
            "{}\n\n[Recent Conversation History]:\n{}",
            retrieved, context.history
        );
        let response = self
            .cascade
            .complete(persona, query, &full_context, false)
            .await?;

        self.bus
            .publish(Event::new(
                EventType::AgentResponse,
                agent_name,
                json!({
                    "query": query,
                    "response_content": response.content,
                    "action_items": response.action_items,
                }),
            ))
            .await;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KeywordKnowledgeBase;
    use crate::llms::CascadeConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn services() -> AgentServices {
        let mut kb = KeywordKnowledgeBase::default();
        kb.insert("fees.md", "Fee deadline is 31 July.");
        AgentServices::new(
            Arc::new(ProviderCascade::new(CascadeConfig::default())),
            Arc::new(kb),
            Arc::new(EventBus::new()),
        )
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_name() {
        let mut actions = ActionRegistry::new();
        actions.register("echo", |params| async move { Ok(Value::Object(params)) });

        let mut params = Map::new();
        params.insert("student_id".to_string(), json!("21CS042"));
        let handler = actions.get("echo").unwrap();
        let out = handler(params).await.unwrap();
        assert_eq!(out["student_id"], "21CS042");
        assert!(actions.get("missing").is_none());
        assert_eq!(actions.names(), vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn test_answer_publishes_agent_response() {
        let services = services();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        services
            .bus
            .subscribe_fn(EventType::AgentResponse, "test", move |event| {
                let counter = counter.clone();
                async move {
                    assert_eq!(event.source(), "finance");
                    assert!(event.get_str("response_content").is_some());
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });

        // No candidates configured: the cascade falls back to the mock table.
        let resp = services
            .answer("finance", "Finance Agent", "fee status", "fee", &AgentContext::default())
            .await
            .unwrap();
        assert!(!resp.content.is_empty());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mock_mode_publishes_nothing() {
        let services = services();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        services
            .bus
            .subscribe_fn(EventType::AgentResponse, "test", move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });

        let ctx = AgentContext::for_role("finance").with_mock_mode(true);
        let resp = services
            .answer("finance", "Finance Agent", "hello", "hello", &ctx)
            .await
            .unwrap();
        assert!(resp.content.starts_with("**Mock Mode Active**"));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_context_keeps_unknown_fields() {
        let ctx: AgentContext = serde_json::from_value(json!({
            "role_id": "hod",
            "history": "user: hi",
            "department": "CSE"
        }))
        .unwrap();
        assert_eq!(ctx.role_id.as_deref(), Some("hod"));
        assert!(!ctx.mock_mode);
        assert_eq!(ctx.extra["department"], "CSE");
    }
}
