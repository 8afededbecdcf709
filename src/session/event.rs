//! Outbound session events.
//!
//! The scheduler publishes these on a broadcast channel; presentation
//! layers subscribe and render. Delivery is best-effort: a lagging
//! subscriber loses old events rather than blocking the turn loop, and
//! subscribers never call back into the scheduler except via
//! `start`/`stop`.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::state::SessionState;

/// An observable event from a running session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A message was appended to the dialogue log.
    MessageAppended { message: Message },

    /// The session state changed.
    StateChanged { state: SessionState },

    /// The completed-turn count changed.
    TurnCountChanged { turn_count: usize },
}
