//! Session lifecycle state and the owned session object.

use serde::{Deserialize, Serialize};

use super::log::DialogueLog;
use super::message::Message;
use crate::source::SessionId;

/// Lifecycle state of a dialogue session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session has run yet (or a reset is in progress).
    Idle,
    /// The turn loop is live.
    Running,
    /// Cancellation observed; the current iteration is winding down.
    Stopping,
    /// Terminal: turn cap reached, stop completed, or startup failed.
    Stopped,
}

impl SessionState {
    /// Returns true while the turn loop is live.
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }

    /// Returns true for the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

/// The single owned session object.
///
/// Mutated exclusively by the scheduler's current turn loop (and by `start`
/// itself, before the loop exists). External callers read it through
/// snapshot accessors; `stop` requests never write fields directly.
#[derive(Debug, Default)]
pub(crate) struct Session {
    /// Assigned by the response source on the opening call; `None` until
    /// the first successful call returns.
    pub id: Option<SessionId>,
    pub state: SessionState,
    /// Completed non-seed turns. Never exceeds the configured cap.
    pub turn_count: usize,
    pub log: DialogueLog,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all session state, returning to a fresh idle session.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// A point-in-time copy of the session, taken under a single lock so the
/// log/turn-count relationship is internally consistent.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Option<SessionId>,
    pub state: SessionState,
    pub turn_count: usize,
    pub messages: Vec<Message>,
}

impl SessionSnapshot {
    pub(crate) fn of(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            state: session.state,
            turn_count: session.turn_count,
            messages: session.log.messages().into_iter().cloned().collect(),
        }
    }
}
