//! # campus-agents
//!
//! Agent orchestration for an institutional ERP.
//!
//! A query enters the [`agents::IntentRouter`], which picks a domain agent by
//! keyword score. Agents answer through the [`llms::ProviderCascade`] (an
//! ordered list of provider/model candidates ending in a deterministic mock
//! reply) or emit domain events on the [`events::EventBus`]. The
//! [`recommendations::RecommendationEngine`] reacts to threshold events, and
//! the [`workflow::WorkflowEngine`] runs approval-gated multi-step processes
//! whose steps call agent actions through the [`agents::AgentDirectory`].
//!
//! [`platform::Platform`] wires everything together; [`server`] exposes it
//! over HTTP.

pub mod agents;
pub mod config;
pub mod events;
pub mod knowledge;
pub mod llms;
pub mod platform;
pub mod policy;
pub mod recommendations;
pub mod server;
pub mod types;
pub mod workflow;

pub use agents::{Agent, AgentContext, AgentDirectory, IntentRouter};
pub use config::Settings;
pub use events::{Event, EventBus, EventType};
pub use llms::ProviderCascade;
pub use platform::Platform;
pub use recommendations::{Recommendation, RecommendationEngine};
pub use types::StructuredResponse;
pub use workflow::{WorkflowEngine, WorkflowTemplate};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
