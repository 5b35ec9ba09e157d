//! Name → agent registry for direct inter-agent calls.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::base_agent::Agent;
use super::error::CommunicationError;

/// Registry of online agents. Names are case-insensitive.
#[derive(Debug, Default)]
pub struct AgentDirectory {
    agents: RwLock<HashMap<String, Arc<dyn Agent>>>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `agent` under its own name.
    pub fn register(&self, agent: Arc<dyn Agent>) {
        let name = agent.name().to_string();
        self.register_as(&name, agent);
    }

    /// Register `agent` under `name`, replacing any agent already there.
    pub fn register_as(&self, name: &str, agent: Arc<dyn Agent>) {
        log::info!("[AgentDirectory] agent registered: {}", name);
        self.agents.write().insert(name.to_lowercase(), agent);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.read().get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.read().contains_key(&name.to_lowercase())
    }

    /// Registered agent names, sorted.
    pub fn online_agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Invoke `action` on agent `to` on behalf of `from`.
    pub async fn send_request(
        &self,
        from: &str,
        to: &str,
        action: &str,
        params: Map<String, Value>,
    ) -> Result<Value, CommunicationError> {
        let agent = self
            .get(to)
            .ok_or_else(|| CommunicationError::AgentUnavailable {
                agent: to.to_string(),
            })?;
        let handler = agent
            .actions()
            .get(action)
            .ok_or_else(|| CommunicationError::ActionUnsupported {
                agent: to.to_string(),
                action: action.to_string(),
            })?;

        log::info!("[AgentDirectory] call {} -> {} [{}]", from, to, action);
        handler(params)
            .await
            .map_err(|source| CommunicationError::ActionFailed {
                agent: to.to_string(),
                action: action.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base_agent::{ActionRegistry, AgentContext};
    use crate::llms::LlmError;
    use crate::types::response::StructuredResponse;
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Debug)]
    struct Stub {
        name: &'static str,
        actions: ActionRegistry,
    }

    impl Stub {
        fn new(name: &'static str) -> Self {
            let mut actions = ActionRegistry::new();
            actions.register("ping", |_| async { Ok(json!("pong")) });
            actions.register("broken", |_| async { anyhow::bail!("ledger offline") });
            Self { name, actions }
        }
    }

    #[async_trait]
    impl Agent for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn display_name(&self) -> &str {
            self.name
        }
        async fn handle(
            &self,
            query: &str,
            _context: &AgentContext,
        ) -> Result<StructuredResponse, LlmError> {
            Ok(StructuredResponse::text(self.name, query))
        }
        async fn briefing(&self) -> Result<StructuredResponse, LlmError> {
            Ok(StructuredResponse::text(self.name, "briefing"))
        }
        fn actions(&self) -> &ActionRegistry {
            &self.actions
        }
    }

    #[tokio::test]
    async fn test_send_request_dispatches_case_insensitively() {
        let directory = AgentDirectory::new();
        directory.register(Arc::new(Stub::new("Finance")));

        let out = directory
            .send_request("academic", "FINANCE", "ping", Map::new())
            .await
            .unwrap();
        assert_eq!(out, json!("pong"));
        assert_eq!(directory.online_agents(), vec!["finance".to_string()]);
    }

    #[tokio::test]
    async fn test_typed_errors() {
        let directory = AgentDirectory::new();
        directory.register(Arc::new(Stub::new("finance")));

        let err = directory
            .send_request("a", "library", "ping", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommunicationError::AgentUnavailable { .. }));

        let err = directory
            .send_request("a", "finance", "transfer", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommunicationError::ActionUnsupported { .. }));

        let err = directory
            .send_request("a", "finance", "broken", Map::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ledger offline"));
    }

    #[test]
    fn test_online_agents_sorted() {
        let directory = AgentDirectory::new();
        for name in ["research", "academic", "finance"] {
            directory.register(Arc::new(Stub::new(name)));
        }
        assert_eq!(directory.online_agents(), vec!["academic", "finance", "research"]);
        assert!(directory.contains("Academic"));
    }
}
