//! Append-only dialogue log.
//!
//! The central message repository for a session: chronological insertion
//! order (which equals turn order, since at most one turn is ever in
//! flight) with O(1) lookup by id.

use std::collections::HashMap;

use super::message::{Message, MessageId};

/// Ordered, append-only store of the session's messages.
///
/// Messages are immutable once pushed. The log is replaced wholesale when a
/// new session starts; it is never mutated by concurrent turns.
#[derive(Debug, Clone, Default)]
pub struct DialogueLog {
    /// All messages by ID (O(1) lookup).
    messages_by_id: HashMap<MessageId, Message>,

    /// Ordered message IDs (chronological = turn order).
    message_order: Vec<MessageId>,
}

impl DialogueLog {
    /// Creates a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to the log.
    pub fn push(&mut self, message: Message) {
        let id = message.id;
        self.messages_by_id.insert(id, message);
        self.message_order.push(id);
    }

    /// Gets a message by its ID.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages_by_id.get(&id)
    }

    /// Returns all messages in chronological order.
    pub fn messages(&self) -> Vec<&Message> {
        self.message_order
            .iter()
            .filter_map(|id| self.messages_by_id.get(id))
            .collect()
    }

    /// Returns the most recently appended message.
    pub fn last(&self) -> Option<&Message> {
        self.message_order
            .last()
            .and_then(|id| self.messages_by_id.get(id))
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.message_order.len()
    }

    /// Returns true if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.message_order.is_empty()
    }

    /// Clears all messages.
    pub fn clear(&mut self) {
        self.messages_by_id.clear();
        self.message_order.clear();
    }
}
