//! Scheduler tuning knobs.

use std::time::Duration;

/// Default cap on completed non-seed turns per session.
pub const DEFAULT_MAX_TURNS: usize = 50;

/// Default pacing delay before each turn.
pub const DEFAULT_TURN_INTERVAL: Duration = Duration::from_secs(2);

/// Default cooldown after a failed turn, before the retry.
pub const DEFAULT_FAILURE_COOLDOWN: Duration = Duration::from_secs(1);

/// Configuration for a [`SessionScheduler`](super::SessionScheduler).
///
/// The pacing interval simulates a human-perceptible cadence between
/// utterances; the failure cooldown keeps retries polite. Both are explicit
/// knobs rather than buried constants.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
/// use roundtable::session::SchedulerConfig;
///
/// let config = SchedulerConfig::new()
///     .with_max_turns(10)
///     .with_turn_interval(Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum completed non-seed turns; reaching it stops the session.
    pub max_turns: usize,

    /// Pacing wait before each turn.
    pub turn_interval: Duration,

    /// Cooldown after a failed turn, before retrying.
    pub failure_cooldown: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            turn_interval: DEFAULT_TURN_INTERVAL,
            failure_cooldown: DEFAULT_FAILURE_COOLDOWN,
        }
    }
}

impl SchedulerConfig {
    /// Creates a configuration with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the turn cap.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Sets the pacing wait before each turn.
    pub fn with_turn_interval(mut self, turn_interval: Duration) -> Self {
        self.turn_interval = turn_interval;
        self
    }

    /// Sets the cooldown after a failed turn.
    pub fn with_failure_cooldown(mut self, failure_cooldown: Duration) -> Self {
        self.failure_cooldown = failure_cooldown;
        self
    }
}
