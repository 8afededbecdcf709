//! 'roundtable' - turn-scheduling and session-state core for round-robin
//! multi-agent dialogues.
//!
//! This library provides the scheduling heart of an automated multi-agent
//! debate: a pool of named agents produce successive utterances in
//! round-robin order, driven by a single originating prompt, until a turn
//! cap is reached or a caller cancels. It deliberately excludes rendering,
//! inference, and transport: presentation layers consume the event stream,
//! and response generation sits behind a single trait.
//!
//! # Components
//!
//! - [`session::SessionScheduler`] owns turn order, pacing, per-turn
//!   failure isolation, and termination. `start`/`stop` are the only
//!   inbound operations; everything else is observed through events and
//!   snapshots.
//! - [`source::ResponseSource`] is the seam for response generation: given
//!   the prompt and session context, yield the next speaker and utterance,
//!   or fail explicitly. [`source::MockResponseSource`] is the built-in
//!   canned implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use roundtable::roster::Roster;
//! use roundtable::session::{SessionEvent, SessionScheduler};
//! use roundtable::source::MockResponseSource;
//!
//! let scheduler = SessionScheduler::new(MockResponseSource::new(), Roster::default());
//! let mut events = scheduler.subscribe();
//!
//! scheduler.start("Is free will real?").await?;
//! while let Ok(event) = events.recv().await {
//!     if let SessionEvent::MessageAppended { message } = event {
//!         println!("[{}] {}", message.speaker, message.content);
//!     }
//! }
//! ```

pub mod error;
pub mod observability;
pub mod roster;
pub mod session;
pub mod source;

pub use error::{SourceError, StartError};
pub use roster::{EmptyRosterError, Roster};
pub use session::{
    DialogueLog, Message, MessageId, SchedulerConfig, SessionEvent, SessionScheduler,
    SessionSnapshot, SessionState,
};
pub use source::{MockResponseSource, ResponseSource, SessionId, TurnReply, TurnRequest};
