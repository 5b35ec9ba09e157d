//! Administrative agent: HR, leave, circulars, approvals and correspondence.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

use super::academic::students_from;
use super::base_agent::{ActionRegistry, Agent, AgentContext, AgentServices};
use super::domain::{AgentProfile, DomainAgent};
use crate::llms::LlmError;
use crate::types::response::StructuredResponse;

pub const ADMINISTRATIVE: AgentProfile = AgentProfile {
    name: "administrative",
    display_name: "Administrative Agent",
    retrieval_hint: "admin hr leave meeting circular file staff",
};

#[derive(Debug)]
pub struct AdministrativeAgent {
    inner: DomainAgent,
}

impl AdministrativeAgent {
    pub fn new(services: AgentServices) -> Self {
        Self {
            inner: DomainAgent::with_actions(ADMINISTRATIVE, services, administrative_actions()),
        }
    }
}

fn administrative_actions() -> ActionRegistry {
    let mut actions = ActionRegistry::new();

    actions.register("request_approval", |params: Map<String, Value>| async move {
        let approver = params
            .get("approver_role")
            .and_then(Value::as_str)
            .unwrap_or("HOD")
            .to_string();
        let subject = params
            .get("subject")
            .and_then(Value::as_str)
            .unwrap_or("Pending workflow step")
            .to_string();
        log::info!("[administrative] approval requested from {}: {}", approver, subject);
        Ok(json!({
            "requested_from": approver,
            "subject": subject,
            "status": "pending",
            "requested_at": Utc::now(),
        }))
    });

    actions.register("send_email", |params: Map<String, Value>| async move {
        let recipients: Vec<String> = match params.get("recipients") {
            Some(Value::Array(list)) => list
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(one)) => vec![one.clone()],
            _ => students_from(&params)
                .iter()
                .filter_map(|s| s.get("student_id").and_then(Value::as_str))
                .map(|id| format!("parent-of-{id}"))
                .collect(),
        };
        if recipients.is_empty() {
            anyhow::bail!("no recipients given");
        }
        log::info!("[administrative] email queued for {} recipient(s)", recipients.len());
        Ok(json!({"sent": true, "recipients": recipients, "sent_at": Utc::now()}))
    });

    actions
}

#[async_trait]
impl Agent for AdministrativeAgent {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn display_name(&self) -> &str {
        self.inner.display_name()
    }

    async fn handle(
        &self,
        query: &str,
        context: &AgentContext,
    ) -> Result<StructuredResponse, LlmError> {
        self.inner.handle(query, context).await
    }

    async fn briefing(&self) -> Result<StructuredResponse, LlmError> {
        self.inner.briefing().await
    }

    fn actions(&self) -> &ActionRegistry {
        self.inner.actions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_email_needs_recipients() {
        let actions = administrative_actions();
        let send = actions.get("send_email").unwrap();

        let mut params = Map::new();
        params.insert("student_id".to_string(), json!("21CS042"));
        let out = send(params).await.unwrap();
        assert_eq!(out["recipients"], json!(["parent-of-21CS042"]));

        assert!(send(Map::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_request_approval_defaults_to_hod() {
        let actions = administrative_actions();
        let out = actions.get("request_approval").unwrap()(Map::new()).await.unwrap();
        assert_eq!(out["requested_from"], "HOD");
        assert_eq!(out["status"], "pending");
    }
}
