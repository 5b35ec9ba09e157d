//! Mapping of domain errors onto HTTP responses.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::agents::CommunicationError;
use crate::recommendations::RecommendationError;
use crate::types::response::StructuredResponse;
use crate::workflow::WorkflowError;

/// An error that renders as `{"success": false, "error_message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("[api] {}: {}", self.status, self.message);
        } else {
            log::debug!("[api] {}: {}", self.status, self.message);
        }
        let body = json!({
            "success": false,
            "error_message": self.message,
            "detail": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<CommunicationError> for ApiError {
    fn from(err: CommunicationError) -> Self {
        let status = match &err {
            CommunicationError::AgentUnavailable { .. } => StatusCode::NOT_FOUND,
            CommunicationError::ActionUnsupported { .. } => StatusCode::BAD_REQUEST,
            CommunicationError::ActionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let status = match &err {
            WorkflowError::TemplateNotFound { .. }
            | WorkflowError::WorkflowNotFound { .. }
            | WorkflowError::StepNotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            WorkflowError::DependencyNotSatisfied { .. } | WorkflowError::InvalidState { .. } => {
                StatusCode::CONFLICT
            }
            WorkflowError::InvalidTemplate { .. } | WorkflowError::Yaml(_) => {
                StatusCode::BAD_REQUEST
            }
            WorkflowError::CapacityExceeded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            WorkflowError::Communication(inner) => {
                return Self::new(Self::from_communication_status(inner), err.to_string());
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<RecommendationError> for ApiError {
    fn from(err: RecommendationError) -> Self {
        let status = match &err {
            RecommendationError::NotFound { .. } => StatusCode::NOT_FOUND,
            RecommendationError::InvalidTransition { .. } => StatusCode::CONFLICT,
            RecommendationError::Llm(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl ApiError {
    fn from_communication_status(err: &CommunicationError) -> StatusCode {
        match err {
            CommunicationError::AgentUnavailable { .. }
            | CommunicationError::ActionUnsupported { .. } => StatusCode::BAD_REQUEST,
            CommunicationError::ActionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// Response used by the panic-catching layer: a structured failure, never a
/// bare 500.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };
    log::error!("[api] handler panicked: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StructuredResponse::failure("System", detail)),
    )
        .into_response()
}
