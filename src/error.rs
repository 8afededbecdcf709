//! Error types for the scheduling core.

use thiserror::Error;

/// Errors produced by a [`ResponseSource`](crate::source::ResponseSource) call.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be reached or refused the call.
    #[error("response source unavailable: {0}")]
    Unavailable(String),

    /// The backing generator failed while producing a reply.
    #[error("response generation failed: {0}")]
    Generation(String),

    /// The caller violated the request contract (e.g. a continuing call
    /// without a session id).
    #[error("invalid source request: {0}")]
    InvalidRequest(String),

    /// The source returned data that violates its reply contract.
    #[error("malformed source reply: {0}")]
    MalformedReply(String),
}

/// Errors surfaced synchronously by
/// [`SessionScheduler::start`](crate::session::SessionScheduler::start).
///
/// These cover prompt validation and session-opening failures only.
/// Mid-session turn failures are never surfaced here: the turn loop absorbs
/// them (skip the turn, cool down, retry) and reports them as diagnostics.
#[derive(Debug, Error)]
pub enum StartError {
    /// The prompt was empty or whitespace-only. Rejected before any state
    /// change; the session is untouched.
    #[error("prompt must not be empty")]
    EmptyPrompt,

    /// The session-opening response source call failed. The session never
    /// transitioned to running and no turns were attempted.
    #[error("failed to open session: {0}")]
    Source(#[from] SourceError),
}
