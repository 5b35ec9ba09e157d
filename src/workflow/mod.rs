//! Approval-gated multi-step workflows.
//!
//! Templates are declared in YAML and validated on registration. Each
//! started instance deep-copies its template's steps and advances them as
//! dependencies complete; gated steps only complete through
//! [`WorkflowEngine::approve_step`] with the configured approver role.

pub mod engine;
pub mod error;
pub mod template;

pub use engine::{
    StepState, StepStatus, StepTransition, WorkflowEngine, WorkflowInstance, WorkflowStatus,
    WorkflowSummary,
};
pub use error::WorkflowError;
pub use template::{builtin_templates, parse_templates, WorkflowStep, WorkflowTemplate};
