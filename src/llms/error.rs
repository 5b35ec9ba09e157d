//! Provider and cascade errors.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single provider candidate. Always absorbed by the cascade,
/// which moves on to the next credential or candidate.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The candidate has no credential to call with.
    #[error("{provider}: no credential configured")]
    MissingCredential { provider: String },

    /// No provider implementation is registered under this name.
    #[error("no provider registered under '{provider}'")]
    UnknownProvider { provider: String },

    /// Connection, TLS or body-read failure.
    #[error("{provider}: request failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status.
    #[error("{provider}: HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    /// The provider answered with an error object.
    #[error("{provider}: API error: {message}")]
    Api { provider: String, message: String },

    /// The call did not finish within its time budget.
    #[error("{provider}/{model}: timed out after {after:?}")]
    Timeout {
        provider: String,
        model: String,
        after: Duration,
    },

    /// The reply did not match the structured response contract.
    #[error("{provider}/{model}: malformed payload: {reason}")]
    MalformedPayload {
        provider: String,
        model: String,
        reason: String,
    },

    /// Every credential of a multi-credential provider failed.
    #[error("{provider}: all {attempted} credential(s) failed; last: {last}")]
    CredentialsExhausted {
        provider: String,
        attempted: usize,
        last: Box<ProviderError>,
    },

    /// The cascade deadline elapsed before this candidate could be tried.
    #[error("deadline reached before {provider}/{model} could be tried")]
    DeadlineReached { provider: String, model: String },
}

/// Failure of a whole cascade run, surfaced only when mock fallback is off.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("all {attempts} provider candidate(s) failed; last error: {last}")]
    CascadeExhausted { attempts: usize, last: ProviderError },

    #[error("no provider candidates configured and mock fallback is disabled")]
    NoCandidates,
}
