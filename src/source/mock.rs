//! Built-in mock response source.
//!
//! Simulates a four-model debate without any real inference backend: each
//! roster member has a small bank of canned utterances, cycled by a shared
//! response index as the round-robin cursor advances. Useful for demos and
//! as the default test double for the scheduler.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::Rng;

use super::{ResponseSource, SessionId, TurnReply, TurnRequest};
use crate::error::SourceError;
use crate::roster::Roster;

const GROK_LINES: [&str; 5] = [
    "Interesting perspective! Let me challenge that assumption with some data...",
    "I appreciate the nuanced take here, but consider this counterpoint...",
    "That's a fascinating angle. Here's what the latest research suggests...",
    "While I understand that viewpoint, there's another way to look at this...",
    "The evidence actually points in a different direction. Let me explain...",
];

const CLAUDE_LINES: [&str; 5] = [
    "I find myself both agreeing and disagreeing with the previous points...",
    "There's wisdom in what's been said, though I'd like to add some context...",
    "The complexity of this issue requires us to consider multiple dimensions...",
    "I appreciate the thoughtful discourse. Here's my contribution to the discussion...",
    "Building on those insights, I think we should also consider...",
];

const CHATGPT_LINES: [&str; 5] = [
    "Great discussion so far! I'd like to offer a different perspective...",
    "The points raised are valid, but there's another layer to consider...",
    "This is exactly the kind of nuanced debate we need. My take is...",
    "I see merit in all these viewpoints. Let me synthesize and add...",
    "The conversation has evolved beautifully. Here's what I think...",
];

const DEEPSEEK_LINES: [&str; 5] = [
    "Analyzing the logical structure of these arguments, I notice...",
    "From a systematic perspective, we should examine the underlying assumptions...",
    "The pattern of reasoning here suggests we might be missing...",
    "Let me approach this from a more analytical angle...",
    "The data underlying these positions tells an interesting story...",
];

fn builtin_bank(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "GROK" => Some(&GROK_LINES),
        "CLAUDE" => Some(&CLAUDE_LINES),
        "CHATGPT" => Some(&CHATGPT_LINES),
        "DEEPSEEK" => Some(&DEEPSEEK_LINES),
        _ => None,
    }
}

/// Cursor and transcript state, guarded by a single lock.
struct MockState {
    /// Next roster index to speak on a continuing call.
    cursor: usize,
    /// Shared index into the per-agent line banks.
    response_index: usize,
    /// `SPEAKER: content` lines for the current session.
    transcript: Vec<String>,
    /// 1-indexed ordinal of continuing calls, for failure scripting.
    continuing_calls: u64,
}

/// A [`ResponseSource`] that serves canned utterances in round-robin order.
///
/// The default roster is `GROK, CLAUDE, CHATGPT, DEEPSEEK`, each with five
/// canned lines. After a session-opening call the cursor sits at roster
/// index 1 (the seed consumed index 0) and wraps modulo the roster size.
///
/// # Examples
///
/// ```rust,ignore
/// use roundtable::source::{MockResponseSource, ResponseSource, TurnRequest};
///
/// let source = MockResponseSource::new();
/// let opening = source.call(TurnRequest::open("Is free will real?")).await?;
/// assert_eq!(opening.speaker, "GROK");
/// assert_eq!(opening.content, "Is free will real?");
///
/// let turn = source
///     .call(TurnRequest::continuing("Is free will real?", opening.session_id))
///     .await?;
/// assert_eq!(turn.speaker, "CLAUDE");
/// ```
pub struct MockResponseSource {
    roster: Roster,
    /// Per-agent line banks, parallel to roster order.
    banks: Vec<Vec<String>>,
    /// Simulated latency range in milliseconds, if any.
    latency_ms: Option<(u64, u64)>,
    /// Continuing-call ordinals scripted to fail.
    fail_calls: HashSet<u64>,
    state: Mutex<MockState>,
}

impl MockResponseSource {
    /// Creates a mock over the default four-model roster.
    pub fn new() -> Self {
        Self::with_roster(Roster::default())
    }

    /// Creates a mock for an arbitrary roster.
    ///
    /// Roster members with a built-in line bank use it; anyone else gets a
    /// small generated bank so replies are never empty.
    pub fn with_roster(roster: Roster) -> Self {
        let banks = roster
            .names()
            .iter()
            .map(|name| match builtin_bank(name) {
                Some(lines) => lines.iter().map(|s| s.to_string()).collect(),
                None => (1..=3)
                    .map(|i| format!("{} weighs in (take {}) on the topic at hand...", name, i))
                    .collect(),
            })
            .collect();

        Self {
            roster,
            banks,
            latency_ms: None,
            fail_calls: HashSet::new(),
            state: Mutex::new(MockState {
                cursor: 0,
                response_index: 0,
                transcript: Vec::new(),
                continuing_calls: 0,
            }),
        }
    }

    /// Simulates per-call latency, uniformly sampled from `[min_ms, max_ms)`.
    ///
    /// Off by default so tests stay fast; the demo enables it to mimic a
    /// real backend's 1-3 s response time.
    pub fn with_latency_ms(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.latency_ms = Some((min_ms, max_ms));
        self
    }

    /// Scripts the given continuing-call ordinals (1-indexed) to fail.
    ///
    /// A scripted failure returns [`SourceError::Unavailable`] without
    /// advancing the cursor, so the speaker sequence is unaffected once the
    /// scheduler retries.
    pub fn fail_on_calls<I>(mut self, calls: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        self.fail_calls = calls.into_iter().collect();
        self
    }

    /// Returns the `SPEAKER: content` transcript of the current session.
    pub fn transcript(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("mock source state lock poisoned")
            .transcript
            .clone()
    }

    fn generate_session_id() -> SessionId {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(9)
            .map(char::from)
            .collect();
        SessionId::new(format!("session_{}_{}", millis, suffix.to_lowercase()))
    }

    async fn simulate_latency(&self) {
        if let Some((min_ms, max_ms)) = self.latency_ms {
            let ms = if max_ms > min_ms {
                rand::thread_rng().gen_range(min_ms..max_ms)
            } else {
                min_ms
            };
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

impl Default for MockResponseSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseSource for MockResponseSource {
    async fn call(&self, request: TurnRequest) -> Result<TurnReply, SourceError> {
        self.simulate_latency().await;

        let mut state = self.state.lock().expect("mock source state lock poisoned");

        if request.new_session {
            let seed_speaker = self.roster.seed_speaker().to_string();
            state.transcript.clear();
            state
                .transcript
                .push(format!("{}: {}", seed_speaker, request.prompt));
            state.cursor = 1 % self.roster.len();
            state.response_index = 0;
            state.continuing_calls = 0;

            return Ok(TurnReply {
                session_id: Self::generate_session_id(),
                speaker: seed_speaker,
                content: request.prompt,
            });
        }

        let session_id = request.session_id.ok_or_else(|| {
            SourceError::InvalidRequest("continuing call without a session id".to_string())
        })?;

        state.continuing_calls += 1;
        if self.fail_calls.contains(&state.continuing_calls) {
            return Err(SourceError::Unavailable(format!(
                "scripted failure for continuing call {}",
                state.continuing_calls
            )));
        }

        let speaker = self.roster.names()[state.cursor].clone();
        let bank = &self.banks[state.cursor];
        let content = bank[state.response_index % bank.len()].clone();

        state.transcript.push(format!("{}: {}", speaker, content));
        state.cursor = (state.cursor + 1) % self.roster.len();
        state.response_index += 1;

        Ok(TurnReply {
            session_id,
            speaker,
            content,
        })
    }
}
