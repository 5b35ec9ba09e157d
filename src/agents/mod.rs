//! Domain agents, the agent directory and the intent router.
//!
//! - [`base_agent`]: the [`Agent`] contract, per-agent action registries and
//!   the shared retrieval-augmented answer path
//! - [`directory`]: name → agent registry for direct inter-agent calls
//! - [`router`]: lexical intent scoring with a fixed tie-break order

pub mod academic;
pub mod accreditation;
pub mod administrative;
pub mod base_agent;
pub mod directory;
pub mod domain;
pub mod error;
pub mod general;
pub mod router;

use std::sync::Arc;

pub use academic::AcademicAgent;
pub use accreditation::AccreditationAgent;
pub use administrative::AdministrativeAgent;
pub use base_agent::{ActionFn, ActionRegistry, Agent, AgentContext, AgentServices};
pub use directory::AgentDirectory;
pub use domain::{AgentProfile, DomainAgent};
pub use error::{AgentError, CommunicationError};
pub use general::GeneralAgent;
pub use router::{IntentRouter, Route, RouteReason, INTENT_TABLE};

/// Register the full institutional roster plus the generic fallback agent.
pub fn register_default_agents(directory: &AgentDirectory, services: &AgentServices) {
    directory.register(Arc::new(AcademicAgent::new(services.clone())));
    for profile in [
        domain::EXAMINATION,
        domain::FINANCE,
        domain::QUALITY,
        domain::STUDENT_SERVICES,
        domain::RESEARCH,
        domain::COMPLIANCE,
    ] {
        directory.register(Arc::new(DomainAgent::new(profile, services.clone())));
    }
    directory.register(Arc::new(AdministrativeAgent::new(services.clone())));
    directory.register(Arc::new(AccreditationAgent::new(services.clone())));
    directory.register(Arc::new(GeneralAgent::new(services.clone())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::knowledge::KeywordKnowledgeBase;
    use crate::llms::{CascadeConfig, ProviderCascade};

    #[test]
    fn test_default_roster_covers_every_intent() {
        let directory = AgentDirectory::new();
        let services = AgentServices::new(
            Arc::new(ProviderCascade::new(CascadeConfig::default())),
            Arc::new(KeywordKnowledgeBase::default()),
            Arc::new(EventBus::new()),
        );
        register_default_agents(&directory, &services);

        for (name, _) in INTENT_TABLE {
            assert!(directory.contains(name), "missing agent {name}");
        }
        assert!(directory.contains(general::NAME));
        assert_eq!(directory.online_agents().len(), INTENT_TABLE.len() + 1);
    }
}
