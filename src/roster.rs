//! Fixed roster of dialogue participants.
//!
//! The roster is the ordered list of agent names taking part in a
//! round-robin dialogue. Speaker order is a pure function of the turn
//! number and the roster, never of message content: index 0 speaks the
//! seed message, and turn `i` (1-indexed) is spoken by index `i % len`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when constructing a roster with no participants.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("roster must contain at least one agent")]
pub struct EmptyRosterError;

/// An ordered, non-empty list of agent names.
///
/// The order is fixed for the lifetime of the roster. Construction is the
/// only validation point: a `Roster` always has at least one member.
///
/// # Examples
///
/// ```rust,ignore
/// use roundtable::roster::Roster;
///
/// let roster = Roster::new(["Alice", "Bob", "Carol"])?;
/// assert_eq!(roster.seed_speaker(), "Alice");
/// assert_eq!(roster.speaker_for_turn(1), "Bob");
/// assert_eq!(roster.speaker_for_turn(3), "Alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    /// Creates a roster from an ordered list of agent names.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyRosterError`] if `names` yields no items.
    pub fn new<I, S>(names: I) -> Result<Self, EmptyRosterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(EmptyRosterError);
        }
        Ok(Self { names })
    }

    /// Returns the seed speaker (the first roster member).
    pub fn seed_speaker(&self) -> &str {
        &self.names[0]
    }

    /// Returns the speaker for the given turn number.
    ///
    /// Turn 0 is the seed; non-seed turns are 1-indexed, so a roster of
    /// size N cycles `names[1], names[2], ..., names[0], names[1], ...`.
    pub fn speaker_for_turn(&self, turn: usize) -> &str {
        &self.names[turn % self.names.len()]
    }

    /// Returns the number of agents in the roster.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: construction rejects empty rosters.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the agent names in roster order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for Roster {
    /// The four-model roster used by the built-in mock source.
    fn default() -> Self {
        Self {
            names: ["GROK", "CLAUDE", "CHATGPT", "DEEPSEEK"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
