//! Agent-layer errors.

use thiserror::Error;

use crate::llms::LlmError;

/// Failure of a direct inter-agent call.
#[derive(Debug, Error)]
pub enum CommunicationError {
    /// No agent is registered under the requested name.
    #[error("agent '{agent}' not found or not online")]
    AgentUnavailable { agent: String },

    /// The agent exists but exposes no action with this name.
    #[error("agent '{agent}' does not support action '{action}'")]
    ActionUnsupported { agent: String, action: String },

    /// The action ran and returned an error.
    #[error("action '{action}' on agent '{agent}' failed: {source:#}")]
    ActionFailed {
        agent: String,
        action: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Failure while answering a routed query or briefing.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Communication(#[from] CommunicationError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}
