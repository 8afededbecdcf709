//! Session scheduler: the paced, cancellable turn loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ SessionScheduler (handle)                               │
//! │ - start(prompt): validate → reset → opening call →      │
//! │   seed message → spawn turn loop                        │
//! │ - stop(): cancel flag only, never a direct field write  │
//! │ - snapshot()/subscribe(): read-only observation         │
//! └────────────────────────┬────────────────────────────────┘
//!                          │ cancellation token + generation
//! ┌────────────────────────▼────────────────────────────────┐
//! │ Turn loop (one tokio task per session)                  │
//! │ - exclusively mutates the Session object                │
//! │ - suspends at the pacing wait and at the source call,   │
//! │   re-checking cancellation after each resume            │
//! │ - absorbs turn failures: skip, cool down, retry         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! At most one turn is ever in flight, so messages append strictly in the
//! order turns complete, which is also the order turns were issued.
//!
//! A superseding `start` cancels the previous loop's token and bumps the
//! generation counter; a superseded loop exits silently, so its in-flight
//! result is ignored rather than corrupting the fresh session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::config::SchedulerConfig;
use super::event::SessionEvent;
use super::message::Message;
use super::state::{Session, SessionSnapshot, SessionState};
use crate::error::{SourceError, StartError};
use crate::roster::Roster;
use crate::source::{ResponseSource, SessionId, TurnReply, TurnRequest};

const EVENT_CHANNEL_CAPACITY: usize = 256;

const LOG_TARGET: &str = "roundtable::session";

/// Stop/supersede plumbing, replaced on every `start`.
struct Control {
    cancel: CancellationToken,
}

/// Drives a round-robin dialogue session against a [`ResponseSource`].
///
/// One scheduler manages one session at a time: starting while a session is
/// running resets cleanly (log cleared, turn count zeroed, stale identity
/// discarded) and supersedes the previous loop.
///
/// # Examples
///
/// ```rust,ignore
/// use roundtable::roster::Roster;
/// use roundtable::session::SessionScheduler;
/// use roundtable::source::MockResponseSource;
///
/// let scheduler = SessionScheduler::new(MockResponseSource::new(), Roster::default());
/// let mut events = scheduler.subscribe();
///
/// scheduler.start("Is free will real?").await?;
/// while let Ok(event) = events.recv().await {
///     println!("{:?}", event);
/// }
/// ```
pub struct SessionScheduler {
    source: Arc<dyn ResponseSource>,
    roster: Roster,
    config: SchedulerConfig,
    session: Arc<RwLock<Session>>,
    events: broadcast::Sender<SessionEvent>,
    control: std::sync::Mutex<Control>,
    /// Generation of the session currently owning the state. Bumped by each
    /// `start`; loops from older generations must not write anything.
    current_generation: Arc<AtomicU64>,
}

impl SessionScheduler {
    /// Creates a scheduler with the default configuration.
    pub fn new(source: impl ResponseSource + 'static, roster: Roster) -> Self {
        Self::with_config(source, roster, SchedulerConfig::default())
    }

    /// Creates a scheduler with an explicit configuration.
    pub fn with_config(
        source: impl ResponseSource + 'static,
        roster: Roster,
        config: SchedulerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            source: Arc::new(source),
            roster,
            config,
            session: Arc::new(RwLock::new(Session::new())),
            events,
            control: std::sync::Mutex::new(Control {
                cancel: CancellationToken::new(),
            }),
            current_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribes to the outbound event stream.
    ///
    /// Events published before the subscription are not replayed; subscribe
    /// before `start` to observe a session from its beginning.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Returns the current session state.
    pub async fn state(&self) -> SessionState {
        self.session.read().await.state
    }

    /// Returns the completed non-seed turn count.
    pub async fn turn_count(&self) -> usize {
        self.session.read().await.turn_count
    }

    /// Returns the session identity, if the opening call has succeeded.
    pub async fn session_id(&self) -> Option<SessionId> {
        self.session.read().await.id.clone()
    }

    /// Returns the dialogue log in turn order.
    pub async fn messages(&self) -> Vec<Message> {
        self.session
            .read()
            .await
            .log
            .messages()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns a consistent point-in-time copy of the whole session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::of(&*self.session.read().await)
    }

    /// Starts a new session from `prompt`.
    ///
    /// Validates the prompt, resets any previous session (superseding its
    /// loop), performs the session-opening source call, appends the seed
    /// message (the prompt verbatim, attributed to the first roster
    /// member), and spawns the turn loop. Returns once the loop is spawned;
    /// the loop itself runs independently until terminal.
    ///
    /// # Errors
    ///
    /// - [`StartError::EmptyPrompt`] if the prompt is empty after trimming;
    ///   no session side effects.
    /// - [`StartError::Source`] if the opening call fails or returns no
    ///   session identity; the session ends Stopped without running.
    pub async fn start(&self, prompt: &str) -> Result<(), StartError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StartError::EmptyPrompt);
        }

        // Supersede any prior session: cancel its loop, claim a generation.
        let (cancel, generation) = {
            let mut control = self
                .control
                .lock()
                .expect("scheduler control lock poisoned");
            control.cancel.cancel();
            let generation = self.current_generation.fetch_add(1, Ordering::SeqCst) + 1;
            control.cancel = CancellationToken::new();
            (control.cancel.clone(), generation)
        };

        // Reset before the opening call. The session reads Idle until the
        // seed call succeeds; a startup failure never shows Running.
        {
            let mut session = self.session.write().await;
            if self.current_generation.load(Ordering::SeqCst) != generation {
                return Ok(()); // superseded before we even began
            }
            session.reset();
        }

        let reply = match self.source.call(TurnRequest::open(prompt)).await {
            Ok(reply) => reply,
            Err(err) => {
                self.commit(generation, |session, events| {
                    session.state = SessionState::Stopped;
                    let _ = events.send(SessionEvent::StateChanged {
                        state: SessionState::Stopped,
                    });
                })
                .await;
                warn!(target: LOG_TARGET, error = %err, event = "session_open_failed");
                return Err(StartError::Source(err));
            }
        };

        if reply.session_id.as_str().is_empty() {
            let err = SourceError::MalformedReply(
                "opening reply carried no session identity".to_string(),
            );
            self.commit(generation, |session, events| {
                session.state = SessionState::Stopped;
                let _ = events.send(SessionEvent::StateChanged {
                    state: SessionState::Stopped,
                });
            })
            .await;
            warn!(target: LOG_TARGET, error = %err, event = "session_open_failed");
            return Err(StartError::Source(err));
        }

        let session_id = reply.session_id.clone();
        let seed = Message::new(self.roster.seed_speaker(), prompt);
        let committed = self
            .commit(generation, |session, events| {
                session.id = Some(session_id.clone());
                session.state = SessionState::Running;
                session.log.push(seed.clone());
                let _ = events.send(SessionEvent::StateChanged {
                    state: SessionState::Running,
                });
                let _ = events.send(SessionEvent::TurnCountChanged { turn_count: 0 });
                let _ = events.send(SessionEvent::MessageAppended { message: seed });
            })
            .await;
        if !committed {
            return Ok(()); // superseded while the opening call was in flight
        }

        info!(
            target: LOG_TARGET,
            session_id = %reply.session_id,
            seed_speaker = %self.roster.seed_speaker(),
            event = "session_started"
        );

        let turn_loop = TurnLoop {
            source: Arc::clone(&self.source),
            config: self.config.clone(),
            session: Arc::clone(&self.session),
            events: self.events.clone(),
            cancel,
            generation,
            current_generation: Arc::clone(&self.current_generation),
            prompt: prompt.to_string(),
            session_id: reply.session_id,
        };
        tokio::spawn(turn_loop.run());

        Ok(())
    }

    /// Requests the running session stop at the next safe point.
    ///
    /// Never interrupts an in-flight source call: its result is still
    /// applied exactly once, but no further turn is scheduled. Idempotent;
    /// a no-op when nothing is running.
    pub fn stop(&self) {
        let control = self
            .control
            .lock()
            .expect("scheduler control lock poisoned");
        control.cancel.cancel();
    }

    /// Runs `apply` against the session iff `generation` is still current.
    async fn commit<F>(&self, generation: u64, apply: F) -> bool
    where
        F: FnOnce(&mut Session, &broadcast::Sender<SessionEvent>),
    {
        let mut session = self.session.write().await;
        if self.current_generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        apply(&mut session, &self.events);
        true
    }
}

/// One session's turn loop; owns every mutation after `start` hands over.
struct TurnLoop {
    source: Arc<dyn ResponseSource>,
    config: SchedulerConfig,
    session: Arc<RwLock<Session>>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    prompt: String,
    session_id: SessionId,
}

impl TurnLoop {
    async fn run(self) {
        loop {
            if self.turn_count().await >= self.config.max_turns {
                self.finish(false).await;
                return;
            }

            // Pacing wait: first cancellable suspension point. Waking early
            // on cancellation is safe; the iteration is abandoned below.
            tokio::select! {
                _ = tokio::time::sleep(self.config.turn_interval) => {}
                _ = self.cancel.cancelled() => {}
            }
            if self.cancel.is_cancelled() {
                self.finish(true).await;
                return;
            }

            // The source call is never interrupted; cancellation is only
            // observed once the call resolves.
            let request = TurnRequest::continuing(self.prompt.as_str(), self.session_id.clone());
            let outcome = match self.source.call(request).await {
                Ok(reply) => self.validate(reply),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(reply) => {
                    let Some(turn_count) = self.commit_turn(reply).await else {
                        return; // superseded: this loop's results no longer apply
                    };
                    if turn_count >= self.config.max_turns {
                        self.finish(false).await;
                        return;
                    }
                    if self.cancel.is_cancelled() {
                        self.finish(true).await;
                        return;
                    }
                }
                Err(err) => {
                    // A failed turn costs time, never turn-count progress:
                    // nothing is appended, nothing is incremented.
                    warn!(
                        target: LOG_TARGET,
                        session_id = %self.session_id,
                        error = %err,
                        event = "turn_failed"
                    );
                    if self.cancel.is_cancelled() {
                        // The retry is skipped once a stop was requested.
                        self.finish(true).await;
                        return;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.failure_cooldown) => {}
                        _ = self.cancel.cancelled() => {}
                    }
                    if self.cancel.is_cancelled() {
                        self.finish(true).await;
                        return;
                    }
                }
            }
        }
    }

    /// Rejects "successful" replies that violate the source contract, so a
    /// malformed message can never reach the log.
    fn validate(&self, reply: TurnReply) -> Result<TurnReply, SourceError> {
        if reply.speaker.is_empty() || reply.content.is_empty() {
            return Err(SourceError::MalformedReply(
                "continuing reply with empty speaker or content".to_string(),
            ));
        }
        if reply.session_id != self.session_id {
            return Err(SourceError::MalformedReply(format!(
                "continuing reply for session {} did not echo session {}",
                reply.session_id, self.session_id
            )));
        }
        Ok(reply)
    }

    async fn turn_count(&self) -> usize {
        self.session.read().await.turn_count
    }

    /// Appends the turn and bumps the count under one lock; returns the new
    /// count, or `None` if this loop has been superseded.
    async fn commit_turn(&self, reply: TurnReply) -> Option<usize> {
        let mut session = self.session.write().await;
        if self.current_generation.load(Ordering::SeqCst) != self.generation {
            return None;
        }

        let message = Message::new(reply.speaker, reply.content);
        let speaker = message.speaker.clone();
        session.log.push(message.clone());
        session.turn_count += 1;
        let turn_count = session.turn_count;

        let _ = self.events.send(SessionEvent::MessageAppended { message });
        let _ = self.events.send(SessionEvent::TurnCountChanged { turn_count });

        info!(
            target: LOG_TARGET,
            session_id = %self.session_id,
            speaker = %speaker,
            turn_count,
            event = "turn_completed"
        );
        Some(turn_count)
    }

    /// Transitions to Stopped (via Stopping when cancellation initiated it)
    /// and emits the state events. Silent if this loop has been superseded.
    async fn finish(&self, via_cancel: bool) {
        let mut session = self.session.write().await;
        if self.current_generation.load(Ordering::SeqCst) != self.generation {
            return;
        }

        if via_cancel {
            session.state = SessionState::Stopping;
            let _ = self.events.send(SessionEvent::StateChanged {
                state: SessionState::Stopping,
            });
        }
        session.state = SessionState::Stopped;
        let _ = self.events.send(SessionEvent::StateChanged {
            state: SessionState::Stopped,
        });

        info!(
            target: LOG_TARGET,
            session_id = %self.session_id,
            turn_count = session.turn_count,
            via_cancel,
            event = "session_stopped"
        );
    }
}
