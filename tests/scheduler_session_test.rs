//! Integration tests for the session scheduler: round-robin ordering,
//! log/turn invariants, turn caps, failure isolation, and stop semantics.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::timeout;

use roundtable::error::{SourceError, StartError};
use roundtable::roster::Roster;
use roundtable::session::{SchedulerConfig, SessionEvent, SessionScheduler, SessionState};
use roundtable::source::{MockResponseSource, ResponseSource, SessionId, TurnReply, TurnRequest};

const PROMPT: &str = "Is free will real?";

/// Small intervals so real-time tests finish quickly.
fn fast_config(max_turns: usize) -> SchedulerConfig {
    SchedulerConfig::new()
        .with_max_turns(max_turns)
        .with_turn_interval(Duration::from_millis(10))
        .with_failure_cooldown(Duration::from_millis(5))
}

/// An interval long enough that no turn completes during a test's
/// assertions (only used without paused time).
fn parked_config() -> SchedulerConfig {
    SchedulerConfig::new().with_turn_interval(Duration::from_secs(60))
}

async fn next_event(events: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    timeout(Duration::from_secs(30), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

async fn wait_for_state(events: &mut broadcast::Receiver<SessionEvent>, wanted: SessionState) {
    loop {
        if let SessionEvent::StateChanged { state } = next_event(events).await {
            if state == wanted {
                return;
            }
        }
    }
}

/// Drains state-change events until Stopped, returning the sequence seen.
async fn states_until_stopped(
    events: &mut broadcast::Receiver<SessionEvent>,
) -> Vec<SessionState> {
    let mut states = Vec::new();
    loop {
        if let SessionEvent::StateChanged { state } = next_event(events).await {
            states.push(state);
            if state == SessionState::Stopped {
                return states;
            }
        }
    }
}

// --- In-test response sources ---------------------------------------------

/// Fails every call.
struct FailingSource;

#[async_trait]
impl ResponseSource for FailingSource {
    async fn call(&self, _request: TurnRequest) -> Result<TurnReply, SourceError> {
        Err(SourceError::Unavailable("backend offline".to_string()))
    }
}

/// Opens sessions without a session identity.
struct AnonymousSource;

#[async_trait]
impl ResponseSource for AnonymousSource {
    async fn call(&self, request: TurnRequest) -> Result<TurnReply, SourceError> {
        Ok(TurnReply {
            session_id: SessionId::new(""),
            speaker: "GROK".to_string(),
            content: request.prompt,
        })
    }
}

enum ScriptedReply {
    Speak(&'static str, &'static str),
    Fail,
}

/// Serves a fixed script of continuing replies; the opening call echoes the
/// prompt under a fixed session id.
struct ScriptedSource {
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl ScriptedSource {
    fn new<I: IntoIterator<Item = ScriptedReply>>(replies: I) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ResponseSource for ScriptedSource {
    async fn call(&self, request: TurnRequest) -> Result<TurnReply, SourceError> {
        if request.new_session {
            return Ok(TurnReply {
                session_id: SessionId::new("session_scripted"),
                speaker: "HOST".to_string(),
                content: request.prompt,
            });
        }
        let session_id = request
            .session_id
            .expect("continuing call should carry a session id");
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SourceError::Unavailable("script exhausted".to_string()))?;
        match reply {
            ScriptedReply::Speak(speaker, content) => Ok(TurnReply {
                session_id,
                speaker: speaker.to_string(),
                content: content.to_string(),
            }),
            ScriptedReply::Fail => Err(SourceError::Unavailable("scripted failure".to_string())),
        }
    }
}

/// Echoes a wrong session id on the first continuing call, then behaves.
struct IdMutatingSource {
    continuing_calls: AtomicU32,
}

impl IdMutatingSource {
    fn new() -> Self {
        Self {
            continuing_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ResponseSource for IdMutatingSource {
    async fn call(&self, request: TurnRequest) -> Result<TurnReply, SourceError> {
        if request.new_session {
            return Ok(TurnReply {
                session_id: SessionId::new("session_fixed"),
                speaker: "HOST".to_string(),
                content: request.prompt,
            });
        }
        let n = self.continuing_calls.fetch_add(1, Ordering::SeqCst);
        let session_id = if n == 0 {
            SessionId::new("session_other")
        } else {
            request.session_id.expect("continuing call carries an id")
        };
        Ok(TurnReply {
            session_id,
            speaker: "HOST".to_string(),
            content: "a reply".to_string(),
        })
    }
}

// --- Scenarios ------------------------------------------------------------

#[tokio::test]
async fn seed_message_and_running_state_after_start() {
    let scheduler = SessionScheduler::with_config(
        MockResponseSource::new(),
        Roster::default(),
        parked_config(),
    );

    scheduler.start(PROMPT).await.unwrap();

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Running);
    assert_eq!(snapshot.turn_count, 0);
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].speaker, "GROK");
    assert_eq!(snapshot.messages[0].content, PROMPT);
    assert!(snapshot.session_id.is_some());

    scheduler.stop();
}

#[tokio::test]
async fn start_emits_running_then_seed() {
    let scheduler = SessionScheduler::with_config(
        MockResponseSource::new(),
        Roster::default(),
        parked_config(),
    );
    let mut events = scheduler.subscribe();

    scheduler.start(PROMPT).await.unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::StateChanged {
            state: SessionState::Running
        }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::TurnCountChanged { turn_count: 0 }
    ));
    match next_event(&mut events).await {
        SessionEvent::MessageAppended { message } => {
            assert_eq!(message.speaker, "GROK");
            assert_eq!(message.content, PROMPT);
        }
        other => panic!("expected the seed message, got {:?}", other),
    }

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn three_turns_follow_roster_order() {
    let scheduler =
        SessionScheduler::with_config(MockResponseSource::new(), Roster::default(), fast_config(3));
    let mut events = scheduler.subscribe();

    scheduler.start(PROMPT).await.unwrap();
    wait_for_state(&mut events, SessionState::Stopped).await;

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.turn_count, 3);
    assert_eq!(snapshot.messages.len(), 4);
    let speakers: Vec<&str> = snapshot
        .messages
        .iter()
        .map(|m| m.speaker.as_str())
        .collect();
    assert_eq!(speakers, ["GROK", "CLAUDE", "CHATGPT", "DEEPSEEK"]);
}

#[tokio::test(start_paused = true)]
async fn full_session_runs_to_the_turn_cap_in_roster_order() {
    // Default config: 50-turn cap, 2 s pacing; paused time auto-advances.
    let scheduler = SessionScheduler::new(MockResponseSource::new(), Roster::default());
    let mut events = scheduler.subscribe();

    scheduler.start(PROMPT).await.unwrap();
    wait_for_state(&mut events, SessionState::Stopped).await;

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.turn_count, 50);
    assert_eq!(snapshot.messages.len(), 51);

    let roster = Roster::default();
    for (i, message) in snapshot.messages.iter().enumerate() {
        assert_eq!(
            message.speaker,
            roster.speaker_for_turn(i),
            "speaker out of roster order at turn {}",
            i
        );
    }
}

#[tokio::test(start_paused = true)]
async fn failed_turn_costs_time_not_turns() {
    // The 2nd continuing call fails once; the sequence must be unaffected.
    let source = MockResponseSource::new().fail_on_calls([2]);
    let scheduler = SessionScheduler::with_config(source, Roster::default(), fast_config(3));
    let mut events = scheduler.subscribe();

    scheduler.start(PROMPT).await.unwrap();
    wait_for_state(&mut events, SessionState::Stopped).await;

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.turn_count, 3);
    assert_eq!(snapshot.messages.len(), 4);
    let speakers: Vec<&str> = snapshot
        .messages
        .iter()
        .map(|m| m.speaker.as_str())
        .collect();
    assert_eq!(speakers, ["GROK", "CLAUDE", "CHATGPT", "DEEPSEEK"]);
    for message in &snapshot.messages {
        assert!(!message.speaker.is_empty());
        assert!(!message.content.is_empty());
    }
}

#[tokio::test]
async fn stop_midway_freezes_turn_count() {
    let scheduler = SessionScheduler::with_config(
        MockResponseSource::new(),
        Roster::default(),
        SchedulerConfig::new().with_turn_interval(Duration::from_millis(50)),
    );
    let mut events = scheduler.subscribe();

    scheduler.start(PROMPT).await.unwrap();

    // Let two turns complete, then stop while the loop is pacing.
    loop {
        if let SessionEvent::TurnCountChanged { turn_count: 2 } = next_event(&mut events).await {
            break;
        }
    }
    scheduler.stop();

    let states = states_until_stopped(&mut events).await;
    assert_eq!(
        states,
        [SessionState::Stopping, SessionState::Stopped],
        "cancellation should pass through Stopping on its way to Stopped"
    );

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Stopped);
    assert_eq!(snapshot.turn_count, 2);
    assert_eq!(snapshot.messages.len(), 3);
}

#[tokio::test]
async fn whitespace_prompt_is_rejected_without_side_effects() {
    let scheduler = SessionScheduler::with_config(
        MockResponseSource::new(),
        Roster::default(),
        parked_config(),
    );
    let mut events = scheduler.subscribe();

    let result = scheduler.start("   ").await;
    assert!(matches!(result, Err(StartError::EmptyPrompt)));

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Idle);
    assert_eq!(snapshot.turn_count, 0);
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.session_id.is_none());
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn opening_failure_surfaces_and_never_runs() {
    let scheduler =
        SessionScheduler::with_config(FailingSource, Roster::default(), parked_config());

    let result = scheduler.start(PROMPT).await;
    assert!(matches!(
        result,
        Err(StartError::Source(SourceError::Unavailable(_)))
    ));

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Stopped);
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.turn_count, 0);
    assert!(snapshot.session_id.is_none());
}

#[tokio::test]
async fn opening_reply_without_identity_is_a_startup_error() {
    let scheduler =
        SessionScheduler::with_config(AnonymousSource, Roster::default(), parked_config());

    let result = scheduler.start(PROMPT).await;
    assert!(matches!(
        result,
        Err(StartError::Source(SourceError::MalformedReply(_)))
    ));
    assert_eq!(scheduler.state().await, SessionState::Stopped);
    assert!(scheduler.messages().await.is_empty());
}

#[tokio::test]
async fn stop_is_idempotent() {
    let scheduler = SessionScheduler::with_config(
        MockResponseSource::new(),
        Roster::default(),
        parked_config(),
    );
    let mut events = scheduler.subscribe();

    scheduler.start(PROMPT).await.unwrap();
    scheduler.stop();
    scheduler.stop();
    scheduler.stop();

    wait_for_state(&mut events, SessionState::Stopped).await;
    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Stopped);
    assert_eq!(snapshot.turn_count, 0);
    assert_eq!(snapshot.messages.len(), 1);

    // Stopping an already-stopped session changes nothing.
    scheduler.stop();
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
    assert_eq!(scheduler.state().await, SessionState::Stopped);
}

#[tokio::test]
async fn stop_when_idle_is_a_noop() {
    let scheduler = SessionScheduler::with_config(
        MockResponseSource::new(),
        Roster::default(),
        parked_config(),
    );
    let mut events = scheduler.subscribe();

    scheduler.stop();

    assert_eq!(scheduler.state().await, SessionState::Idle);
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn restart_resets_cleanly_and_supersedes() {
    let scheduler = SessionScheduler::with_config(
        MockResponseSource::new(),
        Roster::default(),
        parked_config(),
    );

    scheduler.start("first question").await.unwrap();
    let first_id = scheduler.session_id().await.unwrap();

    // The previous loop is parked in its pacing wait; starting again must
    // discard its session entirely.
    scheduler.start("second question").await.unwrap();

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Running);
    assert_eq!(snapshot.turn_count, 0);
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].content, "second question");
    assert_ne!(snapshot.session_id.unwrap(), first_id);

    // The superseded loop exits silently; the fresh session is untouched.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(scheduler.state().await, SessionState::Running);
    assert_eq!(scheduler.turn_count().await, 0);

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn malformed_reply_never_reaches_the_log() {
    let source = ScriptedSource::new([
        ScriptedReply::Speak("", "reply with no speaker"),
        ScriptedReply::Speak("A", "a fine reply"),
        ScriptedReply::Speak("B", "another fine reply"),
    ]);
    let roster = Roster::new(["HOST", "A", "B"]).unwrap();
    let scheduler = SessionScheduler::with_config(source, roster, fast_config(2));
    let mut events = scheduler.subscribe();

    scheduler.start(PROMPT).await.unwrap();
    wait_for_state(&mut events, SessionState::Stopped).await;

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.turn_count, 2);
    assert_eq!(snapshot.messages.len(), 3);
    let speakers: Vec<&str> = snapshot
        .messages
        .iter()
        .map(|m| m.speaker.as_str())
        .collect();
    assert_eq!(speakers, ["HOST", "A", "B"]);
    for message in &snapshot.messages {
        assert!(!message.speaker.is_empty());
        assert!(!message.content.is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn scripted_failure_recovers_on_the_next_iteration() {
    let source = ScriptedSource::new([
        ScriptedReply::Speak("A", "first reply"),
        ScriptedReply::Fail,
        ScriptedReply::Speak("B", "second reply"),
    ]);
    let roster = Roster::new(["HOST", "A", "B"]).unwrap();
    let scheduler = SessionScheduler::with_config(source, roster, fast_config(2));
    let mut events = scheduler.subscribe();

    scheduler.start(PROMPT).await.unwrap();
    wait_for_state(&mut events, SessionState::Stopped).await;

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.turn_count, 2);
    let speakers: Vec<&str> = snapshot
        .messages
        .iter()
        .map(|m| m.speaker.as_str())
        .collect();
    assert_eq!(speakers, ["HOST", "A", "B"]);
}

#[tokio::test(start_paused = true)]
async fn mutated_session_id_is_treated_as_a_failed_turn() {
    let source = IdMutatingSource::new();
    let roster = Roster::new(["HOST"]).unwrap();
    let scheduler = SessionScheduler::with_config(source, roster, fast_config(1));
    let mut events = scheduler.subscribe();

    scheduler.start(PROMPT).await.unwrap();
    wait_for_state(&mut events, SessionState::Stopped).await;

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.turn_count, 1);
    assert_eq!(snapshot.messages.len(), 2);
}

#[tokio::test]
async fn log_length_tracks_turn_count_while_running() {
    let scheduler = SessionScheduler::with_config(
        MockResponseSource::new(),
        Roster::default(),
        SchedulerConfig::new()
            .with_turn_interval(Duration::from_millis(20))
            .with_failure_cooldown(Duration::from_millis(5)),
    );

    scheduler.start(PROMPT).await.unwrap();

    for _ in 0..15 {
        let snapshot = scheduler.snapshot().await;
        if snapshot.state.is_running() {
            assert_eq!(
                snapshot.messages.len(),
                snapshot.turn_count + 1,
                "log length must equal turn count + 1 while running"
            );
        }
        tokio::time::sleep(Duration::from_millis(7)).await;
    }

    scheduler.stop();
}
