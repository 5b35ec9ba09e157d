//! HTTP server for the agent platform.
//!
//! Exposes chat routing, workflows and recommendations as a JSON API under
//! `/api/v1`. Domain errors map to status codes in [`ApiError`]; panics are
//! turned into structured `success: false` bodies.

pub mod error;
pub mod routes;

pub use error::{panic_response, ApiError};
pub use routes::{app_router, AppState};
