//! Dialogue message entities.
//!
//! Messages are immutable once appended to the log: identity via an atomic
//! counter, a speaker name drawn from the roster, an opaque content payload,
//! and a creation timestamp stamped at append time (the instant that drives
//! pacing, not when the underlying response was computed).

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in seconds.
pub(crate) fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after UNIX_EPOCH")
        .as_secs()
}

/// Unique identifier for dialogue messages.
///
/// Uses an atomic counter for process-local uniqueness; messages never
/// outlive the process (sessions are not persisted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

static MESSAGE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl MessageId {
    /// Creates a new unique message ID.
    pub fn new() -> Self {
        Self(MESSAGE_ID_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Returns the inner ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// A single entry in the dialogue log.
///
/// Immutable once appended. The timestamp is assigned at construction;
/// the scheduler constructs messages at the moment it appends them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,

    /// Speaker name, drawn from the session roster.
    pub speaker: String,

    /// Opaque text payload.
    pub content: String,

    /// Creation timestamp (Unix seconds), stamped when appended to the log.
    pub timestamp: u64,
}

impl Message {
    /// Creates a new message stamped with the current time.
    pub fn new(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            speaker: speaker.into(),
            content: content.into(),
            timestamp: current_unix_timestamp(),
        }
    }
}
