//! Turn-taking session scheduling and state.
//!
//! This module is the heart of the crate: a [`SessionScheduler`] drives a
//! round-robin dialogue session against a
//! [`ResponseSource`](crate::source::ResponseSource), appending each
//! utterance to an append-only [`DialogueLog`] and publishing
//! [`SessionEvent`]s for presentation layers.
//!
//! Key properties, enforced here and covered by the integration tests:
//!
//! - While running, the log always holds `turn_count + 1` messages (the
//!   extra one is the seed message: the original prompt attributed to the
//!   first roster member, never generated).
//! - Speaker order is round-robin over the roster, independent of content.
//! - A failed turn costs time, not progress: nothing is appended, the turn
//!   count does not move, and the loop retries after a cooldown.
//! - `stop` is idempotent and never corrupts an in-flight turn.
//! - The turn count never exceeds the configured cap; reaching it stops
//!   the session.

pub mod config;
pub mod event;
pub mod log;
pub mod message;
pub mod scheduler;
pub mod state;

pub use config::{
    DEFAULT_FAILURE_COOLDOWN, DEFAULT_MAX_TURNS, DEFAULT_TURN_INTERVAL, SchedulerConfig,
};
pub use event::SessionEvent;
pub use log::DialogueLog;
pub use message::{Message, MessageId};
pub use scheduler::SessionScheduler;
pub use state::{SessionSnapshot, SessionState};
