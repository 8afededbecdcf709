//! Response source: the seam between scheduling and generation.
//!
//! The scheduler is deliberately ignorant of how utterances are produced.
//! Everything it needs is behind the [`ResponseSource`] trait: given the
//! originating prompt and session context, yield the next speaker and
//! utterance, or fail explicitly. Swapping the built-in mock for a real
//! inference backend means implementing this one trait.
//!
//! # Contract
//!
//! - On a session-opening call (`new_session == true`) the source returns a
//!   freshly generated session id and does **not** generate an utterance:
//!   the seed utterance is the prompt echoed back, attributed to the first
//!   roster member.
//! - On a continuing call it returns exactly one speaker/utterance pair,
//!   advances its internal round-robin cursor by exactly one position, and
//!   echoes the session id unchanged.
//! - Failures are explicit (`Err`); a failed call never returns partial
//!   data and never advances the cursor.
//! - Sources do not self-limit: the scheduler is responsible for not
//!   calling past its turn cap.
//!
//! The round-robin cursor is internal state owned entirely by the source
//! implementation. The scheduler never replicates or inspects it.

pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

pub use mock::MockResponseSource;

/// Opaque session identity, assigned by the response source when a session
/// is opened. The scheduler does not know it until the opening call returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single request to the response source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    /// The originating prompt for the session.
    pub prompt: String,

    /// The session this request continues; absent when opening a new one.
    pub session_id: Option<SessionId>,

    /// True for the session-opening call.
    pub new_session: bool,
}

impl TurnRequest {
    /// Builds the session-opening request.
    pub fn open(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_id: None,
            new_session: true,
        }
    }

    /// Builds a continuing-session request.
    pub fn continuing(prompt: impl Into<String>, session_id: SessionId) -> Self {
        Self {
            prompt: prompt.into(),
            session_id: Some(session_id),
            new_session: false,
        }
    }
}

/// A successful reply from the response source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    /// Fresh on a session-opening reply; echoed unchanged otherwise.
    pub session_id: SessionId,

    /// Who speaks this turn.
    pub speaker: String,

    /// What they say. On an opening reply this is the prompt echoed back.
    pub content: String,
}

/// The capability that yields the next speaker and utterance.
///
/// See the [module documentation](self) for the full contract.
#[async_trait]
pub trait ResponseSource: Send + Sync {
    /// Produces the next reply for the given request.
    async fn call(&self, request: TurnRequest) -> Result<TurnReply, SourceError>;
}
