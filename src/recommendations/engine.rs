//! Reactive and on-demand recommendation generation.
//!
//! The engine is constructed explicitly and registers its own event
//! handlers through [`RecommendationEngine::subscribe`]. Handlers hold a weak
//! reference, so dropping the last `Arc` to the engine silences them.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::error::RecommendationError;
use crate::events::{Event, EventBus, EventType, HandlerId};
use crate::llms::ProviderCascade;
use crate::policy::RolePolicy;
use crate::types::response::StructuredResponse;

const SOURCE: &str = "recommendations";
const WORKFLOW_START_PATH: &str = "/api/v1/workflows/start";
const EXPLAIN_PERSONA: &str = "Recommendation Analyst";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Pending,
    Accepted,
    Dismissed,
}

impl fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Dismissed => "dismissed",
        })
    }
}

/// Something the user can do about a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub label: String,
    /// `button` or `link`.
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_call: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl SuggestedAction {
    pub fn button(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action_type: "button".to_string(),
            api_call: None,
            url: None,
            payload: None,
            variant: None,
        }
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            action_type: "link".to_string(),
            url: Some(url.into()),
            ..Self::button(label)
        }
    }

    pub fn calling(mut self, api_call: impl Into<String>, payload: Value) -> Self {
        self.api_call = Some(api_call.into());
        self.payload = Some(payload);
        self
    }

    pub fn secondary(mut self) -> Self {
        self.variant = Some("secondary".to_string());
        self
    }

    /// Button that starts `template` through the workflow API.
    fn start_workflow(label: &str, template: &str, inputs: Value) -> Self {
        Self::button(label).calling(
            WORKFLOW_START_PATH,
            json!({
                "workflow_template": template,
                "inputs": inputs,
                "initiator": SOURCE,
            }),
        )
    }

    /// Name of the workflow template this action would start, if any.
    pub fn workflow_template(&self) -> Option<&str> {
        if self.api_call.as_deref() != Some(WORKFLOW_START_PATH) {
            return None;
        }
        self.payload.as_ref()?.get("workflow_template")?.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub description: String,
    pub target_role: String,
    pub priority: Priority,
    #[serde(alias = "actions")]
    pub suggested_actions: Vec<SuggestedAction>,
    pub status: RecommendationStatus,
    /// Event type that triggered a reactive recommendation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<EventType>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Recommendation {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        target_role: impl Into<String>,
        priority: Priority,
        suggested_actions: Vec<SuggestedAction>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            target_role: target_role.into(),
            priority,
            suggested_actions,
            status: RecommendationStatus::Pending,
            trigger: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RecommendationStatus::Pending
    }
}

/// `72.0` renders as `72`, `68.5` as `68.5`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct RecommendationEngine {
    store: RwLock<VecDeque<Recommendation>>,
    bus: Arc<EventBus>,
    cascade: Arc<ProviderCascade>,
    policy: RolePolicy,
    capacity: usize,
}

impl fmt::Debug for RecommendationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommendationEngine")
            .field("stored", &self.store.read().len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl RecommendationEngine {
    /// Engine holding at most `capacity` recommendations (at least one).
    pub fn new(
        bus: Arc<EventBus>,
        cascade: Arc<ProviderCascade>,
        policy: RolePolicy,
        capacity: usize,
    ) -> Self {
        Self {
            store: RwLock::new(VecDeque::new()),
            bus,
            cascade,
            policy,
            capacity: capacity.max(1),
        }
    }

    /// Register the reactive handlers on the bus.
    pub fn subscribe(self: &Arc<Self>) -> Vec<HandlerId> {
        vec![
            self.subscribe_to(EventType::AttendanceBelowThreshold, "recommendations.attendance"),
            self.subscribe_to(EventType::GradeBelowThreshold, "recommendations.grades"),
        ]
    }

    fn subscribe_to(self: &Arc<Self>, event_type: EventType, name: &str) -> HandlerId {
        let engine: Weak<Self> = Arc::downgrade(self);
        self.bus.subscribe_fn(event_type, name, move |event| {
            let engine = engine.clone();
            async move {
                let Some(engine) = engine.upgrade() else {
                    return Ok(());
                };
                engine.react(&event).await?;
                Ok(())
            }
        })
    }

    /// Turn a threshold-crossing event into one stored recommendation and
    /// announce it with a `RecommendationCreated` event.
    pub async fn react(&self, event: &Event) -> Result<Recommendation, RecommendationError> {
        let mut rec = match event.event_type() {
            EventType::GradeBelowThreshold => grade_alert(event),
            _ => attendance_alert(event),
        };
        rec.trigger = Some(event.event_type());
        log::info!(
            "[RecommendationEngine] {} -> '{}' for {}",
            event.event_type(),
            rec.title,
            rec.target_role
        );

        self.store(vec![rec.clone()]);
        self.bus
            .publish(Event::new(
                EventType::RecommendationCreated,
                SOURCE,
                json!({
                    "rec_id": rec.id,
                    "title": rec.title,
                    "target_role": rec.target_role,
                    "priority": rec.priority,
                }),
            ))
            .await;
        Ok(rec)
    }

    /// Canned recommendations for `query`, addressed to the caller's role.
    /// Always returns at least one.
    pub fn generate(&self, query: &str, context: &Map<String, Value>) -> Vec<Recommendation> {
        let role = context
            .get("role_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let recs = on_demand(query, role);
        log::info!(
            "[RecommendationEngine] generated {} recommendation(s) for {}",
            recs.len(),
            role
        );
        self.store(recs.clone());
        recs
    }

    /// Pending recommendations addressed to `role`, or all of them for an
    /// aggregator role. Oldest first.
    pub fn list_pending(&self, role: &str) -> Vec<Recommendation> {
        self.store
            .read()
            .iter()
            .filter(|r| r.is_pending() && self.policy.can_view(role, &r.target_role))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Recommendation> {
        self.store.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    pub async fn accept(&self, id: &str) -> Result<Recommendation, RecommendationError> {
        self.transition(id, RecommendationStatus::Accepted).await
    }

    pub async fn dismiss(&self, id: &str) -> Result<Recommendation, RecommendationError> {
        self.transition(id, RecommendationStatus::Dismissed).await
    }

    /// Move a pending recommendation to `to`. Resolved recommendations never
    /// change again.
    async fn transition(
        &self,
        id: &str,
        to: RecommendationStatus,
    ) -> Result<Recommendation, RecommendationError> {
        let updated = {
            let mut store = self.store.write();
            let rec = store
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| RecommendationError::NotFound { id: id.to_string() })?;
            if !rec.is_pending() {
                return Err(RecommendationError::InvalidTransition {
                    id: id.to_string(),
                    from: rec.status,
                    to,
                });
            }
            rec.status = to;
            rec.resolved_at = Some(Utc::now());
            rec.clone()
        };

        log::info!("[RecommendationEngine] {} is now {}", id, to);
        self.bus
            .publish(Event::new(
                EventType::RecommendationStatusChanged,
                SOURCE,
                json!({"rec_id": id, "status": to}),
            ))
            .await;
        Ok(updated)
    }

    /// Narrative explanation of a stored recommendation.
    pub async fn explain(
        &self,
        id: &str,
        force_mock: bool,
    ) -> Result<StructuredResponse, RecommendationError> {
        let rec = self
            .get(id)
            .ok_or_else(|| RecommendationError::NotFound { id: id.to_string() })?;
        let context = serde_json::to_string_pretty(&rec).unwrap_or_default();
        let query = format!(
            "Explain why this recommendation matters and what to do next: {}. {}",
            rec.title, rec.description
        );
        let response = self
            .cascade
            .complete(EXPLAIN_PERSONA, &query, &context, force_mock)
            .await?;
        Ok(response.with_metadata("rec_id", json!(rec.id)))
    }

    /// Append `recs`, evicting resolved entries first, then the oldest
    /// pending ones, to stay within capacity.
    fn store(&self, recs: Vec<Recommendation>) {
        let mut store = self.store.write();
        store.extend(recs);
        while store.len() > self.capacity {
            let evicted = match store.iter().position(|r| !r.is_pending()) {
                Some(idx) => store.remove(idx),
                None => store.pop_front(),
            };
            if let Some(rec) = evicted {
                log::debug!("[RecommendationEngine] evicted {} ({})", rec.id, rec.status);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn attendance_alert(event: &Event) -> Recommendation {
    let student_id = event.get_str("student_id").unwrap_or("Unknown").to_string();
    let percentage = event
        .get_f64("percentage")
        .or_else(|| event.get_f64("attendance"))
        .unwrap_or(0.0);

    Recommendation::new(
        format!("Attendance Alert: {student_id}"),
        format!(
            "Student attendance has dropped to {}%. Immediate intervention required.",
            format_number(percentage)
        ),
        "faculty",
        Priority::High,
        vec![
            SuggestedAction::start_workflow(
                "Initiate Intervention Workflow",
                "student_intervention",
                Value::Object(event.payload().clone()),
            ),
            SuggestedAction::button("Email Parents")
                .calling(
                    "/api/v1/agents/administrative/actions/send_email",
                    json!({"student_id": student_id}),
                )
                .secondary(),
        ],
    )
}

fn grade_alert(event: &Event) -> Recommendation {
    let student_id = event.get_str("student_id").unwrap_or("Unknown").to_string();
    let subject = event
        .get_str("subject")
        .or_else(|| event.get_str("course"))
        .unwrap_or("a core course");
    let score = event
        .get_f64("score")
        .or_else(|| event.get_f64("grade"))
        .map(format_number)
        .unwrap_or_else(|| "a failing mark".to_string());

    Recommendation::new(
        format!("Grade Alert: {student_id}"),
        format!("Student scored {score} in {subject}, below the pass threshold. Remedial support advised."),
        "faculty",
        Priority::High,
        vec![
            SuggestedAction::start_workflow(
                "Start Remediation Workflow",
                "academic_remediation",
                Value::Object(event.payload().clone()),
            ),
            SuggestedAction::button("Schedule Counselling").secondary(),
        ],
    )
}

fn on_demand(query: &str, role: &str) -> Vec<Recommendation> {
    let lower = query.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    let mut recs = Vec::new();

    if mentions(&["intervention", "attendance"]) {
        recs.push(Recommendation::new(
            "Targeted Attendance Intervention",
            "Data shows 15 students below threshold. Suggest launching automated intervention \
             workflow. Avg Attendance: 82%. 15 Students < 75%.",
            role,
            Priority::High,
            vec![
                SuggestedAction::start_workflow(
                    "Launch Intervention Workflow",
                    "student_intervention",
                    json!({}),
                ),
                SuggestedAction::link("View At-Risk Students", "/students?filter=risk"),
            ],
        ));
    }

    if mentions(&["grant", "research"]) {
        recs.push(Recommendation::new(
            "Apply for SERB Grant",
            "Upcoming deadline for SERB Power Grant. Your profile matches eligible criteria. \
             Publications: 12. Grants Pending: 2.",
            role,
            Priority::Medium,
            vec![SuggestedAction::button("Draft Proposal")],
        ));
    }

    if mentions(&["budget"]) {
        recs.push(Recommendation::new(
            "Review Budget Utilization",
            "Budget Utilization: 65%. Q4 Remaining. Reallocate unspent lab funds before the \
             quarter closes.",
            role,
            Priority::Medium,
            vec![SuggestedAction::link("Open Budget Dashboard", "/finance/budget")],
        ));
    }

    if recs.is_empty() {
        recs.push(Recommendation::new(
            "General System Optimization",
            "System performance is stable. No critical anomalies detected.",
            role,
            Priority::Low,
            vec![SuggestedAction::link("View Dashboard", "/")],
        ));
    }
    recs
}
