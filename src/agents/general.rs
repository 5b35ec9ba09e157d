//! The generic fallback agent used when no domain agent scores.

use async_trait::async_trait;

use super::base_agent::{ActionRegistry, Agent, AgentContext, AgentServices};
use crate::llms::LlmError;
use crate::types::response::StructuredResponse;

pub const NAME: &str = "orchestrator";
pub const DISPLAY_NAME: &str = "Orchestrator";

/// Retrieval-augmented answers with no domain specialization.
#[derive(Debug)]
pub struct GeneralAgent {
    services: AgentServices,
    actions: ActionRegistry,
}

impl GeneralAgent {
    pub fn new(services: AgentServices) -> Self {
        Self {
            services,
            actions: ActionRegistry::new(),
        }
    }
}

#[async_trait]
impl Agent for GeneralAgent {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }

    async fn handle(
        &self,
        query: &str,
        context: &AgentContext,
    ) -> Result<StructuredResponse, LlmError> {
        self.services
            .answer(NAME, DISPLAY_NAME, query, query, context)
            .await
    }

    async fn briefing(&self) -> Result<StructuredResponse, LlmError> {
        let context = self.services.knowledge.search("system status");
        self.services
            .cascade
            .complete(
                DISPLAY_NAME,
                "Generate concise system overview with 1 action item and 1 PDF report",
                &context,
                false,
            )
            .await
    }

    fn actions(&self) -> &ActionRegistry {
        &self.actions
    }
}
