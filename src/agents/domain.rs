//! Knowledge-backed domain agents that need no special behavior.

use async_trait::async_trait;

use super::base_agent::{ActionRegistry, Agent, AgentContext, AgentServices};
use crate::llms::LlmError;
use crate::types::response::StructuredResponse;

/// Static description of a domain agent.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: &'static str,
    pub display_name: &'static str,
    /// Terms appended to the query for retrieval.
    pub retrieval_hint: &'static str,
}

pub const EXAMINATION: AgentProfile = AgentProfile {
    name: "examination",
    display_name: "Examination Agent",
    retrieval_hint: "exam schedule result grade rules evaluation",
};

pub const FINANCE: AgentProfile = AgentProfile {
    name: "finance",
    display_name: "Finance Agent",
    retrieval_hint: "finance budget fee salary invoice payments",
};

pub const QUALITY: AgentProfile = AgentProfile {
    name: "quality",
    display_name: "Quality Assurance Agent",
    retrieval_hint: "naac nba aqar accreditation iqac criteria",
};

pub const STUDENT_SERVICES: AgentProfile = AgentProfile {
    name: "student_services",
    display_name: "Student Services Agent",
    retrieval_hint: "placement internship hostel scholarship grievance club",
};

pub const RESEARCH: AgentProfile = AgentProfile {
    name: "research",
    display_name: "Research Agent",
    retrieval_hint: "research publication patent project phd grant paper",
};

pub const COMPLIANCE: AgentProfile = AgentProfile {
    name: "compliance",
    display_name: "Compliance Agent",
    retrieval_hint: "compliance aicte nirf aishe regulation approval mandatory",
};

/// Agent answering through the shared retrieval path with its own hint.
#[derive(Debug)]
pub struct DomainAgent {
    profile: AgentProfile,
    services: AgentServices,
    actions: ActionRegistry,
}

impl DomainAgent {
    pub fn new(profile: AgentProfile, services: AgentServices) -> Self {
        Self::with_actions(profile, services, ActionRegistry::new())
    }

    pub fn with_actions(
        profile: AgentProfile,
        services: AgentServices,
        actions: ActionRegistry,
    ) -> Self {
        Self {
            profile,
            services,
            actions,
        }
    }

    pub fn services(&self) -> &AgentServices {
        &self.services
    }
}

#[async_trait]
impl Agent for DomainAgent {
    fn name(&self) -> &str {
        self.profile.name
    }

    fn display_name(&self) -> &str {
        self.profile.display_name
    }

    async fn handle(
        &self,
        query: &str,
        context: &AgentContext,
    ) -> Result<StructuredResponse, LlmError> {
        let retrieval = format!("{} {}", query, self.profile.retrieval_hint);
        self.services
            .answer(
                self.profile.name,
                self.profile.display_name,
                query,
                &retrieval,
                context,
            )
            .await
    }

    async fn briefing(&self) -> Result<StructuredResponse, LlmError> {
        let query = format!("Generate a welcome briefing for {}", self.profile.name);
        self.services
            .cascade
            .complete(self.profile.display_name, &query, "", false)
            .await
    }

    fn actions(&self) -> &ActionRegistry {
        &self.actions
    }
}
