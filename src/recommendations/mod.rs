//! Actionable suggestions, produced reactively from threshold events or on
//! demand from a query.

pub mod engine;
pub mod error;

pub use engine::{
    Priority, Recommendation, RecommendationEngine, RecommendationStatus, SuggestedAction,
};
pub use error::RecommendationError;
