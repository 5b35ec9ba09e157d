//! Academic operations agent: attendance, timetables, workload, CO-PO.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use super::base_agent::{ActionRegistry, Agent, AgentContext, AgentServices};
use super::domain::{AgentProfile, DomainAgent};
use crate::events::{Event, EventBus, EventType};
use crate::llms::LlmError;
use crate::types::response::{Document, StructuredResponse};

pub const ACADEMIC: AgentProfile = AgentProfile {
    name: "academic",
    display_name: "Academic Agent",
    retrieval_hint: "academic syllabus curriculum faculty workload attendance",
};

/// Minimum attendance percentage before a shortage letter is due.
pub const SHORTAGE_THRESHOLD: f64 = 75.0;

/// Percentage recorded for a student marked absent. The attendance register
/// lives outside this service, so the figure is fixed.
const ABSENT_PERCENTAGE: f64 = 72.0;

const DEFAULT_STUDENT_ID: &str = "21CS042";

static ROLL_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d{2}[a-z]{2,4}\d{3}\b").expect("valid roll number regex"));

#[derive(Debug)]
pub struct AcademicAgent {
    inner: DomainAgent,
}

impl AcademicAgent {
    pub fn new(services: AgentServices) -> Self {
        let actions = academic_actions(&services.bus);
        Self {
            inner: DomainAgent::with_actions(ACADEMIC, services, actions),
        }
    }
}

/// Record an attendance mark and publish the resulting events. Returns the
/// student's attendance percentage.
pub async fn mark_attendance(bus: &EventBus, student_id: &str, status: &str) -> f64 {
    log::info!("[academic] marking attendance: {} -> {}", student_id, status);
    let percentage = ABSENT_PERCENTAGE;

    bus.publish(Event::new(
        EventType::AttendanceUpdated,
        ACADEMIC.name,
        json!({"student_id": student_id, "status": status, "percentage": percentage}),
    ))
    .await;

    if status.eq_ignore_ascii_case("absent") && percentage < SHORTAGE_THRESHOLD {
        bus.publish(Event::new(
            EventType::AttendanceBelowThreshold,
            ACADEMIC.name,
            json!({"student_id": student_id, "percentage": percentage}),
        ))
        .await;
    }
    percentage
}

fn str_param<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

/// Students handed to an action, either by the `identify_students` step's
/// output or directly in the parameters.
pub fn students_from(params: &Map<String, Value>) -> Vec<Value> {
    if let Some(list) = params
        .get("upstream")
        .and_then(|u| u.get("identify_students"))
        .and_then(|s| s.get("students"))
        .and_then(Value::as_array)
    {
        return list.clone();
    }
    if let Some(list) = params.get("students").and_then(Value::as_array) {
        return list.clone();
    }
    str_param(params, "student_id")
        .map(|id| vec![json!({"student_id": id})])
        .unwrap_or_default()
}

fn academic_actions(bus: &Arc<EventBus>) -> ActionRegistry {
    let mut actions = ActionRegistry::new();

    actions.register("identify_shortage_students", |params| async move {
        let students = match str_param(&params, "student_id") {
            Some(id) => {
                let percentage = params
                    .get("percentage")
                    .and_then(Value::as_f64)
                    .unwrap_or(ABSENT_PERCENTAGE);
                vec![json!({"student_id": id, "percentage": percentage})]
            }
            None => vec![
                json!({"student_id": "21CS042", "percentage": 72.0}),
                json!({"student_id": "21CS017", "percentage": 68.5}),
            ],
        };
        Ok(json!({
            "threshold": SHORTAGE_THRESHOLD,
            "count": students.len(),
            "students": students,
        }))
    });

    actions.register("generate_shortage_letters", |params| async move {
        let students = students_from(&params);
        if students.is_empty() {
            anyhow::bail!("no students to write shortage letters for");
        }
        let letters: Vec<Document> = students
            .iter()
            .filter_map(|s| s.get("student_id").and_then(Value::as_str))
            .map(|id| Document::pdf(format!("Shortage_Letter_{id}.pdf")))
            .collect();
        Ok(json!({"count": letters.len(), "letters": letters}))
    });

    let bus_for_marking = Arc::clone(bus);
    actions.register("mark_attendance", move |params| {
        let bus = Arc::clone(&bus_for_marking);
        async move {
            let student_id = str_param(&params, "student_id")
                .ok_or_else(|| anyhow::anyhow!("missing 'student_id'"))?
                .to_string();
            let status = str_param(&params, "status").unwrap_or("ABSENT").to_uppercase();
            let percentage = mark_attendance(&bus, &student_id, &status).await;
            Ok::<_, anyhow::Error>(
                json!({"student_id": student_id, "status": status, "percentage": percentage}),
            )
        }
    });

    actions.register("schedule_remedial_classes", |params| async move {
        let sessions = params.get("sessions").and_then(Value::as_u64).unwrap_or(4);
        let students = students_from(&params);
        Ok(json!({
            "sessions": sessions,
            "students": students,
            "slot": "Saturday 10:00-12:00",
        }))
    });

    actions
}

#[async_trait]
impl Agent for AcademicAgent {
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
        let lower = query.to_lowercase();
        if lower.contains("mark attendance") || lower.contains("absent") {
            let student_id = ROLL_NUMBER
                .find(query)
                .map(|m| m.as_str().to_uppercase())
                .unwrap_or_else(|| DEFAULT_STUDENT_ID.to_string());
            let status = "ABSENT";
            mark_attendance(&self.inner.services().bus, &student_id, status).await;
            return Ok(StructuredResponse::text(
                self.display_name(),
                format!(
                    "Attendance for Student **{student_id}** marked as **{status}**. (Event Published)"
                ),
            ));
        }
        self.inner.handle(query, context).await
    }

    async fn briefing(&self) -> Result<StructuredResponse, LlmError> {
        let services = self.inner.services();
        let context = services
            .knowledge
            .search("class schedule today faculty status");
        services
            .cascade
            .complete(self.display_name(), "Generate morning academic briefing", &context, false)
            .await
    }

    fn actions(&self) -> &ActionRegistry {
        self.inner.actions()
    }
}
