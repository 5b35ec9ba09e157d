//! Errors raised by the workflow engine.

use thiserror::Error;

use super::engine::StepStatus;
use crate::agents::CommunicationError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow template {template} not found")]
    TemplateNotFound { template: String },

    #[error("Workflow {workflow_id} not found")]
    WorkflowNotFound { workflow_id: String },

    #[error("Step {step_id} not found in workflow {workflow_id}")]
    StepNotFound { workflow_id: String, step_id: String },

    #[error("Step {step_id} requires approval from {required}, not {given}")]
    PermissionDenied {
        step_id: String,
        required: String,
        given: String,
    },

    #[error("Step {step_id} is blocked by unfinished dependencies {pending:?}")]
    DependencyNotSatisfied { step_id: String, pending: Vec<String> },

    #[error("Step {step_id} cannot change from {status}: {reason}")]
    InvalidState {
        step_id: String,
        status: StepStatus,
        reason: String,
    },

    #[error("Invalid workflow template {template}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Workflow capacity of {limit} instances reached and none can be evicted")]
    CapacityExceeded { limit: usize },

    #[error("Failed to parse workflow templates: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The owning agent could not run the step's action.
    #[error(transparent)]
    Communication(#[from] CommunicationError),
}

impl WorkflowError {
    /// True for errors caused by an unknown workflow or template id.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TemplateNotFound { .. } | Self::WorkflowNotFound { .. }
        )
    }
}
