//! Runtime assembly: builds every component from [`Settings`] and wires them
//! together.

use std::sync::Arc;

use anyhow::Context;
use serde_json::json;

use crate::agents::{register_default_agents, AgentDirectory, AgentServices, IntentRouter};
use crate::config::Settings;
use crate::events::{Event, EventBus, EventType};
use crate::knowledge::{KeywordKnowledgeBase, KnowledgeConfig, KnowledgeSource};
use crate::llms::ProviderCascade;
use crate::policy::RolePolicy;
use crate::recommendations::RecommendationEngine;
use crate::workflow::WorkflowEngine;

/// Every long-lived service of the process.
#[derive(Debug, Clone)]
pub struct Platform {
    pub settings: Arc<Settings>,
    pub bus: Arc<EventBus>,
    pub cascade: Arc<ProviderCascade>,
    pub directory: Arc<AgentDirectory>,
    pub router: Arc<IntentRouter>,
    pub workflows: Arc<WorkflowEngine>,
    pub recommendations: Arc<RecommendationEngine>,
}

impl Platform {
    /// Build from settings: real providers, the on-disk knowledge base and
    /// any extra workflow templates.
    pub fn build(settings: Settings) -> anyhow::Result<Self> {
        let knowledge =
            KeywordKnowledgeBase::load(&settings.knowledge_base_path, KnowledgeConfig::default())
                .with_context(|| {
                    format!("loading knowledge base from {}", settings.knowledge_base_path)
                })?;
        let cascade = ProviderCascade::from_settings(&settings);
        let templates_path = settings.workflow_templates_path.clone();
        let platform = Self::assemble(settings, cascade, Arc::new(knowledge))?;

        if let Some(path) = templates_path {
            let yaml = std::fs::read_to_string(&path)
                .with_context(|| format!("reading workflow templates from {path}"))?;
            let count = platform.workflows.load_templates_yaml(&yaml)?;
            log::info!("Loaded {} workflow template(s) from {}", count, path);
        }
        Ok(platform)
    }

    /// Wire the components around an explicit cascade and knowledge source.
    pub fn assemble(
        settings: Settings,
        cascade: ProviderCascade,
        knowledge: Arc<dyn KnowledgeSource>,
    ) -> anyhow::Result<Self> {
        let bus = Arc::new(EventBus::new());
        let cascade = Arc::new(cascade);
        let policy = RolePolicy::institutional();

        let directory = Arc::new(AgentDirectory::new());
        let services = AgentServices::new(Arc::clone(&cascade), knowledge, Arc::clone(&bus));
        register_default_agents(&directory, &services);

        let router = Arc::new(IntentRouter::new(Arc::clone(&directory), policy.clone()));
        let workflows = Arc::new(WorkflowEngine::with_builtin_templates(
            Arc::clone(&directory),
            Arc::clone(&bus),
            settings.max_workflow_instances,
        )?);
        let recommendations = Arc::new(RecommendationEngine::new(
            Arc::clone(&bus),
            Arc::clone(&cascade),
            policy,
            settings.max_recommendations,
        ));
        recommendations.subscribe();

        Ok(Self {
            settings: Arc::new(settings),
            bus,
            cascade,
            directory,
            router,
            workflows,
            recommendations,
        })
    }

    /// Platform that never leaves the process: no provider candidates, an
    /// empty knowledge base, mock fallback on.
    pub fn offline() -> anyhow::Result<Self> {
        let settings = Settings::default();
        let cascade = ProviderCascade::new(crate::llms::CascadeConfig::from_settings(&settings));
        Self::assemble(settings, cascade, Arc::new(KeywordKnowledgeBase::default()))
    }

    /// Publish the `SystemStartup` event.
    pub async fn announce_startup(&self) {
        let report = self
            .bus
            .publish(Event::new(
                EventType::SystemStartup,
                "platform",
                json!({
                    "version": crate::VERSION,
                    "agents": self.directory.online_agents(),
                    "candidates": self.cascade.attempts().len(),
                }),
            ))
            .await;
        log::info!(
            "Platform started: {} agents online, {} handler(s) notified",
            self.directory.online_agents().len(),
            report.delivered
        );
    }
}
