use thiserror::Error;

use super::engine::RecommendationStatus;
use crate::llms::LlmError;

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Recommendation {id} not found")]
    NotFound { id: String },

    #[error("Recommendation {id} is already {from}, cannot become {to}")]
    InvalidTransition {
        id: String,
        from: RecommendationStatus,
        to: RecommendationStatus,
    },

    #[error(transparent)]
    Llm(#[from] LlmError),
}
