//! Typed failures for the analysis and auth endpoints
//!
//! Analysis errors are part of the screen state (a Failed screen carries
//! one), so they are `Clone` and hold plain strings rather than the
//! underlying transport error.

use thiserror::Error;

/// Failure taxonomy for a single analyze exchange. None of these are
/// retried internally; retry is a user-initiated re-submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Network unreachable, connection refused, or timeout.
    #[error("could not reach the analysis service: {0}")]
    Transport(String),

    /// The service rejected the credential (401/403). The session is
    /// cleared by the orchestrator when this surfaces.
    #[error("the analysis service rejected the credential")]
    Unauthorized,

    /// Any other non-success status.
    #[error("the analysis service failed (HTTP {status})")]
    Server { status: u16 },

    /// A success status whose body lacks the expected report field.
    #[error("the analysis service returned an unexpected response")]
    MalformedResponse,
}

/// Failures for the login and signup endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("could not reach the service: {0}")]
    Transport(String),

    /// The service refused the request; carries its human-readable
    /// `detail` message (wrong password, duplicate email, ...).
    #[error("{0}")]
    Rejected(String),

    #[error("the service returned an unexpected response")]
    MalformedResponse,
}
