//! Template-driven step executor with approval gates.
//!
//! Every instance lives behind its own async mutex, so concurrent calls on
//! one instance are serialized while different instances progress
//! independently. Domain events are collected while the lock is held and
//! published after it is released.
//!
//! Step lifecycle:
//!
//! ```text
//! PENDING -> IN_PROGRESS ---------------------> COMPLETED
//!        \-> WAITING_APPROVAL (gated steps) --> COMPLETED
//! any non-terminal state ---------------------> FAILED
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex as SyncMutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::WorkflowError;
use super::template::{builtin_templates, parse_templates, WorkflowStep, WorkflowTemplate};
use crate::agents::AgentDirectory;
use crate::events::{Event, EventBus, EventType};

const SOURCE: &str = "workflow";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Status shared by workflow instances and their steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    WaitingApproval,
    Completed,
    Failed,
}

pub type StepStatus = WorkflowStatus;

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::WaitingApproval => "waiting_approval",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Instance state
// ---------------------------------------------------------------------------

/// A template step plus its per-instance progress.
#[derive(Debug, Clone, Serialize)]
pub struct StepState {
    #[serde(flatten)]
    pub step: WorkflowStep,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepState {
    fn new(step: WorkflowStep) -> Self {
        Self {
            step,
            status: StepStatus::Pending,
            output: None,
            error: None,
            approved_by: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.step.id
    }
}

/// One running execution of a template.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowInstance {
    pub id: String,
    pub template: String,
    pub status: WorkflowStatus,
    pub steps: Vec<StepState>,
    pub inputs: Map<String, Value>,
    pub initiator: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    fn new(template: &WorkflowTemplate, inputs: Map<String, Value>, initiator: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            template: template.name.clone(),
            status: WorkflowStatus::InProgress,
            steps: template.steps.iter().cloned().map(StepState::new).collect(),
            inputs,
            initiator: initiator.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&StepState> {
        self.steps.iter().find(|s| s.id() == step_id)
    }

    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id() == step_id)
    }

    /// Dependencies of step `idx` that are not COMPLETED yet.
    fn pending_dependencies(&self, idx: usize) -> Vec<String> {
        self.steps[idx]
            .step
            .depends_on
            .iter()
            .filter(|dep| {
                self.step(dep)
                    .map_or(true, |s| s.status != StepStatus::Completed)
            })
            .cloned()
            .collect()
    }

    /// Parameters handed to a step's action: the instance inputs plus the
    /// outputs of every completed step under `upstream`.
    fn step_params(&self, idx: usize) -> Map<String, Value> {
        let mut params = self.inputs.clone();
        let upstream: Map<String, Value> = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .filter_map(|s| s.output.clone().map(|out| (s.id().to_string(), out)))
            .collect();
        params.insert("workflow_id".to_string(), json!(self.id));
        params.insert("step_id".to_string(), json!(self.steps[idx].id()));
        params.insert("upstream".to_string(), Value::Object(upstream));
        params
    }

    /// Promote every PENDING step whose dependencies are all COMPLETED and
    /// re-derive the instance status. Returns the events this produced.
    fn refresh(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.status.is_terminal() {
            return events;
        }
        let now = Utc::now();

        // Dependencies always point backwards, so one ordered pass suffices.
        for idx in 0..self.steps.len() {
            if self.steps[idx].status != StepStatus::Pending
                || !self.pending_dependencies(idx).is_empty()
            {
                continue;
            }
            let workflow_id = self.id.clone();
            let state = &mut self.steps[idx];
            state.started_at = Some(now);
            if state.step.requires_approval {
                state.status = StepStatus::WaitingApproval;
                log::info!(
                    "[WorkflowEngine] {} step '{}' awaits approval from {}",
                    workflow_id,
                    state.step.id,
                    state.step.approver_role.as_deref().unwrap_or_default()
                );
                events.push(Event::new(
                    EventType::ApprovalRequired,
                    SOURCE,
                    json!({
                        "workflow_id": workflow_id,
                        "step_id": state.step.id,
                        "step_name": state.step.name,
                        "approver_role": state.step.approver_role,
                    }),
                ));
            } else {
                state.status = StepStatus::InProgress;
            }
        }

        let has = |status: StepStatus| self.steps.iter().any(|s| s.status == status);
        let derived = if has(StepStatus::Failed) {
            WorkflowStatus::Failed
        } else if self.steps.iter().all(|s| s.status == StepStatus::Completed) {
            WorkflowStatus::Completed
        } else if !has(StepStatus::InProgress) && has(StepStatus::WaitingApproval) {
            WorkflowStatus::WaitingApproval
        } else {
            WorkflowStatus::InProgress
        };

        if derived == WorkflowStatus::Completed {
            log::info!("[WorkflowEngine] {} ({}) completed", self.id, self.template);
            events.push(Event::new(
                EventType::WorkflowCompleted,
                SOURCE,
                json!({"workflow_id": self.id, "template": self.template}),
            ));
        }
        self.status = derived;
        self.updated_at = now;
        events
    }

    fn complete_step(&mut self, idx: usize, output: Option<Value>, approved_by: Option<&str>) -> Event {
        let state = &mut self.steps[idx];
        state.status = StepStatus::Completed;
        state.output = output;
        state.approved_by = approved_by.map(str::to_string);
        state.completed_at = Some(Utc::now());
        log::info!("[WorkflowEngine] {} step '{}' completed", self.id, state.step.id);
        Event::new(
            EventType::WorkflowStepCompleted,
            SOURCE,
            json!({
                "workflow_id": self.id,
                "step_id": state.step.id,
                "approved_by": state.approved_by,
            }),
        )
    }

    /// Mark step `idx` and the instance FAILED.
    fn fail_step(&mut self, idx: usize, reason: String) -> Event {
        let now = Utc::now();
        let state = &mut self.steps[idx];
        state.status = StepStatus::Failed;
        state.error = Some(reason.clone());
        state.completed_at = Some(now);
        let step_id = state.step.id.clone();
        self.status = WorkflowStatus::Failed;
        self.updated_at = now;
        log::warn!("[WorkflowEngine] {} step '{}' failed: {}", self.id, step_id, reason);
        Event::new(
            EventType::WorkflowFailed,
            SOURCE,
            json!({
                "workflow_id": self.id,
                "template": self.template,
                "step_id": step_id,
                "error": reason,
            }),
        )
    }

    pub fn summary(&self) -> WorkflowSummary {
        let total_steps = self.steps.len();
        WorkflowSummary {
            workflow_id: self.id.clone(),
            workflow_name: self.template.clone(),
            status: self.status,
            current_step: (self.completed_steps() + 1).min(total_steps),
            total_steps,
            initiator: self.initiator.clone(),
            created_at: self.created_at,
        }
    }
}

/// Row of the active-workflows listing.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub workflow_id: String,
    pub workflow_name: String,
    pub status: WorkflowStatus,
    /// One-based index of the next step to finish.
    pub current_step: usize,
    pub total_steps: usize,
    pub initiator: String,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful approval.
#[derive(Debug, Clone, Serialize)]
pub struct StepTransition {
    pub workflow_id: String,
    pub step_id: String,
    pub step_status: StepStatus,
    pub workflow_status: WorkflowStatus,
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

type InstanceHandle = Arc<Mutex<WorkflowInstance>>;

pub struct WorkflowEngine {
    templates: RwLock<HashMap<String, Arc<WorkflowTemplate>>>,
    instances: DashMap<String, InstanceHandle>,
    /// Held across the capacity check and the insert of a new instance.
    admission: SyncMutex<()>,
    directory: Arc<AgentDirectory>,
    bus: Arc<EventBus>,
    max_instances: usize,
}

impl fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("templates", &self.templates.read().len())
            .field("instances", &self.instances.len())
            .field("max_instances", &self.max_instances)
            .finish()
    }
}

impl WorkflowEngine {
    /// Engine with no templates registered.
    pub fn new(directory: Arc<AgentDirectory>, bus: Arc<EventBus>, max_instances: usize) -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            instances: DashMap::new(),
            admission: SyncMutex::new(()),
            directory,
            bus,
            max_instances,
        }
    }

    /// Engine preloaded with the built-in templates.
    pub fn with_builtin_templates(
        directory: Arc<AgentDirectory>,
        bus: Arc<EventBus>,
        max_instances: usize,
    ) -> Result<Self, WorkflowError> {
        let engine = Self::new(directory, bus, max_instances);
        for template in builtin_templates()? {
            engine.register_template(template)?;
        }
        Ok(engine)
    }

    /// Validate and register `template`, replacing one with the same name.
    pub fn register_template(&self, template: WorkflowTemplate) -> Result<(), WorkflowError> {
        template.validate()?;
        log::info!(
            "[WorkflowEngine] template registered: {} ({} steps)",
            template.name,
            template.steps.len()
        );
        self.templates
            .write()
            .insert(template.name.clone(), Arc::new(template));
        Ok(())
    }

    /// Register every template of a `templates:` YAML document. Nothing is
    /// registered if any template is invalid.
    pub fn load_templates_yaml(&self, yaml: &str) -> Result<usize, WorkflowError> {
        let templates = parse_templates(yaml)?;
        for template in &templates {
            template.validate()?;
        }
        let count = templates.len();
        for template in templates {
            self.register_template(template)?;
        }
        Ok(count)
    }

    /// Registered templates, sorted by name.
    pub fn templates(&self) -> Vec<Arc<WorkflowTemplate>> {
        let mut templates: Vec<_> = self.templates.read().values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Create an instance of `template_name` and return its id.
    pub async fn start_workflow(
        &self,
        template_name: &str,
        inputs: Map<String, Value>,
        initiator: &str,
    ) -> Result<String, WorkflowError> {
        let template = self
            .templates
            .read()
            .get(template_name)
            .cloned()
            .ok_or_else(|| WorkflowError::TemplateNotFound {
                template: template_name.to_string(),
            })?;
        let (workflow_id, events) = {
            let _admission = self.admission.lock();
            self.make_room()?;

            let mut instance = WorkflowInstance::new(&template, inputs, initiator);
            let workflow_id = instance.id.clone();
            let mut events = vec![Event::new(
                EventType::WorkflowStarted,
                SOURCE,
                json!({
                    "workflow_id": workflow_id,
                    "template": template.name,
                    "initiator": initiator,
                }),
            )];
            events.extend(instance.refresh());
            self.instances
                .insert(workflow_id.clone(), Arc::new(Mutex::new(instance)));
            (workflow_id, events)
        };

        log::info!(
            "[WorkflowEngine] started {} (id {}) for {}",
            template_name,
            workflow_id,
            initiator
        );
        self.publish_all(events).await;
        Ok(workflow_id)
    }

    /// Sign off on `step_id`.
    ///
    /// Gated steps complete once `approver_role` matches their configured
    /// role. Steps without a gate are completed by running their agent
    /// action; a failing action marks the step and the instance FAILED.
    /// Every rejection leaves the instance untouched.
    pub async fn approve_step(
        &self,
        workflow_id: &str,
        step_id: &str,
        approver_role: &str,
    ) -> Result<StepTransition, WorkflowError> {
        let handle = self.instance(workflow_id)?;
        let mut events = Vec::new();
        let result = {
            let mut instance = handle.lock().await;
            self.approve_locked(&mut instance, step_id, approver_role, &mut events)
                .await
        };
        self.publish_all(events).await;
        result
    }

    async fn approve_locked(
        &self,
        instance: &mut WorkflowInstance,
        step_id: &str,
        approver_role: &str,
        events: &mut Vec<Event>,
    ) -> Result<StepTransition, WorkflowError> {
        let idx = instance
            .step_index(step_id)
            .ok_or_else(|| WorkflowError::StepNotFound {
                workflow_id: instance.id.clone(),
                step_id: step_id.to_string(),
            })?;
        let state = &instance.steps[idx];

        if instance.status.is_terminal() {
            return Err(WorkflowError::InvalidState {
                step_id: step_id.to_string(),
                status: state.status,
                reason: format!("workflow is already {}", instance.status),
            });
        }
        if state.step.requires_approval {
            let required = state.step.approver_role.as_deref().unwrap_or_default();
            if approver_role != required {
                return Err(WorkflowError::PermissionDenied {
                    step_id: step_id.to_string(),
                    required: required.to_string(),
                    given: approver_role.to_string(),
                });
            }
        }
        let pending = instance.pending_dependencies(idx);
        if !pending.is_empty() {
            return Err(WorkflowError::DependencyNotSatisfied {
                step_id: step_id.to_string(),
                pending,
            });
        }

        match (state.step.requires_approval, state.status) {
            (true, StepStatus::WaitingApproval) => {
                log::info!(
                    "[WorkflowEngine] {} step '{}' approved by {}",
                    instance.id,
                    step_id,
                    approver_role
                );
                events.push(instance.complete_step(idx, None, Some(approver_role)));
            }
            (false, StepStatus::InProgress) => {
                self.execute_step(instance, idx, events).await?;
                instance.steps[idx].approved_by = Some(approver_role.to_string());
            }
            (_, status) => {
                return Err(WorkflowError::InvalidState {
                    step_id: step_id.to_string(),
                    status,
                    reason: "step is not awaiting sign-off".to_string(),
                });
            }
        }

        events.extend(instance.refresh());
        Ok(StepTransition {
            workflow_id: instance.id.clone(),
            step_id: step_id.to_string(),
            step_status: instance.steps[idx].status,
            workflow_status: instance.status,
        })
    }

    /// Run the action of every ready non-gated step, repeatedly, until the
    /// instance is blocked on an approval, finished, or failed.
    pub async fn run_ready_steps(&self, workflow_id: &str) -> Result<WorkflowInstance, WorkflowError> {
        let handle = self.instance(workflow_id)?;
        let mut events = Vec::new();
        let result = {
            let mut instance = handle.lock().await;
            self.run_locked(&mut instance, &mut events)
                .await
                .map(|()| instance.clone())
        };
        self.publish_all(events).await;
        result
    }

    async fn run_locked(
        &self,
        instance: &mut WorkflowInstance,
        events: &mut Vec<Event>,
    ) -> Result<(), WorkflowError> {
        while let Some(idx) = instance
            .steps
            .iter()
            .position(|s| s.status == StepStatus::InProgress && !s.step.requires_approval)
        {
            if instance.status.is_terminal() {
                break;
            }
            self.execute_step(instance, idx, events).await?;
            events.extend(instance.refresh());
        }
        Ok(())
    }

    /// Dispatch step `idx` to its owning agent through the directory.
    async fn execute_step(
        &self,
        instance: &mut WorkflowInstance,
        idx: usize,
        events: &mut Vec<Event>,
    ) -> Result<(), WorkflowError> {
        let step = instance.steps[idx].step.clone();
        let params = instance.step_params(idx);
        log::debug!(
            "[WorkflowEngine] {} step '{}' -> {}.{}",
            instance.id,
            step.id,
            step.agent,
            step.action
        );

        match self
            .directory
            .send_request(SOURCE, &step.agent, &step.action, params)
            .await
        {
            Ok(output) => {
                events.push(instance.complete_step(idx, Some(output), None));
                Ok(())
            }
            Err(err) => {
                events.push(instance.fail_step(idx, err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Explicitly fail `step_id`, which fails the whole instance.
    pub async fn fail_step(
        &self,
        workflow_id: &str,
        step_id: &str,
        reason: &str,
    ) -> Result<WorkflowInstance, WorkflowError> {
        let handle = self.instance(workflow_id)?;
        let (event, snapshot) = {
            let mut instance = handle.lock().await;
            let idx = instance
                .step_index(step_id)
                .ok_or_else(|| WorkflowError::StepNotFound {
                    workflow_id: workflow_id.to_string(),
                    step_id: step_id.to_string(),
                })?;
            let status = instance.steps[idx].status;
            if instance.status.is_terminal() || status.is_terminal() {
                return Err(WorkflowError::InvalidState {
                    step_id: step_id.to_string(),
                    status,
                    reason: format!("workflow is {}", instance.status),
                });
            }
            let event = instance.fail_step(idx, reason.to_string());
            (event, instance.clone())
        };
        self.publish_all(vec![event]).await;
        Ok(snapshot)
    }

    /// Snapshot of an instance and its per-step statuses.
    pub async fn get_status(&self, workflow_id: &str) -> Result<WorkflowInstance, WorkflowError> {
        let handle = self.instance(workflow_id)?;
        let snapshot = handle.lock().await.clone();
        Ok(snapshot)
    }

    /// Summaries of every stored instance, oldest first.
    pub async fn list_active(&self) -> Vec<WorkflowSummary> {
        let handles: Vec<InstanceHandle> = self
            .instances
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            summaries.push(handle.lock().await.summary());
        }
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    fn instance(&self, workflow_id: &str) -> Result<InstanceHandle, WorkflowError> {
        self.instances
            .get(workflow_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| WorkflowError::WorkflowNotFound {
                workflow_id: workflow_id.to_string(),
            })
    }

    /// Evict the oldest terminal instances until there is room for one more.
    fn make_room(&self) -> Result<(), WorkflowError> {
        if self.instances.len() < self.max_instances {
            return Ok(());
        }

        // Instances locked by an in-flight call are busy, hence not evictable.
        let mut terminal: Vec<(DateTime<Utc>, String)> = self
            .instances
            .iter()
            .filter_map(|entry| {
                let instance = entry.value().try_lock().ok()?;
                instance
                    .status
                    .is_terminal()
                    .then(|| (instance.updated_at, instance.id.clone()))
            })
            .collect();
        terminal.sort();

        for (_, id) in terminal {
            if self.instances.len() < self.max_instances {
                break;
            }
            log::info!("[WorkflowEngine] evicting finished workflow {}", id);
            self.instances.remove(&id);
        }

        if self.instances.len() < self.max_instances {
            Ok(())
        } else {
            log::warn!(
                "[WorkflowEngine] capacity of {} instances reached",
                self.max_instances
            );
            Err(WorkflowError::CapacityExceeded {
                limit: self.max_instances,
            })
        }
    }

    async fn publish_all(&self, events: Vec<Event>) {
        for event in events {
            let report = self.bus.publish(event).await;
            if !report.is_clean() {
                log::warn!(
                    "[WorkflowEngine] {} handler(s) failed on {}",
                    report.failures.len(),
                    report.event_type
                );
            }
        }
    }
}
