//! Domain event type and the immutable event record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Every kind of event the bus can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "system.startup")]
    SystemStartup,
    #[serde(rename = "system.error")]
    ErrorOccurred,
    #[serde(rename = "user.login")]
    UserLogin,
    #[serde(rename = "accreditation.renewal_due")]
    AccreditationRenewalDue,
    #[serde(rename = "attendance.updated")]
    AttendanceUpdated,
    #[serde(rename = "attendance.below_threshold")]
    AttendanceBelowThreshold,
    #[serde(rename = "grade.changed")]
    GradeChanged,
    #[serde(rename = "grade.below_threshold")]
    GradeBelowThreshold,
    #[serde(rename = "workflow.started")]
    WorkflowStarted,
    #[serde(rename = "workflow.step_completed")]
    WorkflowStepCompleted,
    #[serde(rename = "workflow.completed")]
    WorkflowCompleted,
    #[serde(rename = "workflow.failed")]
    WorkflowFailed,
    #[serde(rename = "approval.required")]
    ApprovalRequired,
    #[serde(rename = "document.generated")]
    DocumentGenerated,
    #[serde(rename = "recommendation.created")]
    RecommendationCreated,
    #[serde(rename = "recommendation.status_changed")]
    RecommendationStatusChanged,
    #[serde(rename = "agent.response")]
    AgentResponse,
}

impl EventType {
    /// Dotted wire name, e.g. `attendance.below_threshold`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemStartup => "system.startup",
            Self::ErrorOccurred => "system.error",
            Self::UserLogin => "user.login",
            Self::AccreditationRenewalDue => "accreditation.renewal_due",
            Self::AttendanceUpdated => "attendance.updated",
            Self::AttendanceBelowThreshold => "attendance.below_threshold",
            Self::GradeChanged => "grade.changed",
            Self::GradeBelowThreshold => "grade.below_threshold",
            Self::WorkflowStarted => "workflow.started",
            Self::WorkflowStepCompleted => "workflow.step_completed",
            Self::WorkflowCompleted => "workflow.completed",
            Self::WorkflowFailed => "workflow.failed",
            Self::ApprovalRequired => "approval.required",
            Self::DocumentGenerated => "document.generated",
            Self::RecommendationCreated => "recommendation.created",
            Self::RecommendationStatusChanged => "recommendation.status_changed",
            Self::AgentResponse => "agent.response",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published notification. Fields are private: once built, an event is
/// shared behind an `Arc` and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: String,
    event_type: EventType,
    source: String,
    payload: Map<String, Value>,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Build an event. A non-object payload is stored under the `value` key.
    pub fn new(event_type: EventType, source: impl Into<String>, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            source: source.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Name of the component that emitted the event.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Numeric payload entry; numeric strings such as `"72"` are accepted.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.payload.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
            _ => None,
        }
    }
}
