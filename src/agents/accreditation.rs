//! Accreditation manager: SAR narratives, program-outcome gap analysis, MBGL status.

use async_trait::async_trait;
use serde_json::json;

use super::base_agent::{ActionRegistry, Agent, AgentContext, AgentServices};
use crate::llms::LlmError;
use crate::types::response::{Document, StructuredResponse, Visualization};

pub const NAME: &str = "accreditation_manager";
pub const DISPLAY_NAME: &str = "Accreditation Manager";

/// Target attainment percentage for each program outcome.
const PO_TARGET: u32 = 70;

/// Latest program-outcome attainment for the flagship program.
const PO_ATTAINMENT: &[(&str, u32)] = &[
    ("PO1", 75),
    ("PO2", 72),
    ("PO3", 68),
    ("PO4", 58),
    ("PO5", 80),
];

const PROGRAM_PROFILE: &str = "Program: B.Tech Computer Science\nAcademic year: 2024-25\n\
Strengths: strong industry connect, high placement\nWeaknesses: research funding\n\
Faculty count: 25\nPlacement rate: 85%";

#[derive(Debug)]
pub struct AccreditationAgent {
    services: AgentServices,
    actions: ActionRegistry,
}

impl AccreditationAgent {
    pub fn new(services: AgentServices) -> Self {
        Self {
            services,
            actions: ActionRegistry::new(),
        }
    }

    async fn sar_narrative(&self, mock: bool) -> Result<StructuredResponse, LlmError> {
        let query = "Write the \"Executive Summary\" section of the Self-Assessment Report \
                     in formal academic language, citing the program data.";
        let mut response = self
            .services
            .cascade
            .complete(DISPLAY_NAME, query, PROGRAM_PROFILE, mock)
            .await?;
        let mut document = Document::pdf("SAR_Executive_Summary.md");
        document.kind = "markdown".to_string();
        response.documents_generated.push(document);
        Ok(response)
    }

    fn gap_analysis(&self) -> StructuredResponse {
        let gaps: Vec<&str> = PO_ATTAINMENT
            .iter()
            .filter(|(_, value)| *value < PO_TARGET)
            .map(|(po, _)| *po)
            .collect();
        let labels: Vec<&str> = PO_ATTAINMENT.iter().map(|(po, _)| *po).collect();
        let values: Vec<u32> = PO_ATTAINMENT.iter().map(|(_, v)| *v).collect();

        StructuredResponse {
            content: format!(
                "**Gap Analysis Generated**\n\nIdentified {} gaps requiring attention: {}.",
                gaps.len(),
                gaps.join(", ")
            ),
            visualizations: vec![Visualization::new(
                "bar",
                "PO Attainment Gaps",
                json!({"labels": labels, "values": values, "target": PO_TARGET}),
            )],
            agent_name: DISPLAY_NAME.to_string(),
            ..StructuredResponse::default()
        }
    }
}

#[async_trait]
impl Agent for AccreditationAgent {
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
        let lower = query.to_lowercase();
        if lower.contains("sar") && lower.contains("generate") {
            return self.sar_narrative(context.mock_mode).await;
        }
        if lower.contains("gap") && lower.contains("analysis") {
            return Ok(self.gap_analysis());
        }
        self.services
            .cascade
            .complete(DISPLAY_NAME, query, "", context.mock_mode)
            .await
    }

    async fn briefing(&self) -> Result<StructuredResponse, LlmError> {
        Ok(StructuredResponse::text(
            DISPLAY_NAME,
            "**Accreditation Status Briefing**\n\n- **MBGL Status**: Level 3 (Established)\n\
             - **Renewal Due**: B.Tech MECH (180 days)\n\
             - **Action Required**: Upload latest faculty publications for SAR.",
        ))
    }

    fn actions(&self) -> &ActionRegistry {
        &self.actions
    }
}
