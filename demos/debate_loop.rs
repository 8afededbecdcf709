use std::time::Duration;

use roundtable::observability::{self, ObservabilityConfig};
use roundtable::roster::Roster;
use roundtable::session::{SchedulerConfig, SessionEvent, SessionScheduler, SessionState};
use roundtable::source::MockResponseSource;

#[tokio::main]
async fn main() {
    if let Err(e) = observability::init(ObservabilityConfig::default()) {
        eprintln!("failed to initialize observability: {}", e);
    }

    println!("--- Running Mock Debate ---");

    // The mock simulates backend latency; the scheduler paces turns on top.
    let source = MockResponseSource::new().with_latency_ms(300, 800);
    let config = SchedulerConfig::new()
        .with_max_turns(8)
        .with_turn_interval(Duration::from_millis(500));
    let scheduler = SessionScheduler::with_config(source, Roster::default(), config);

    let mut events = scheduler.subscribe();

    if let Err(e) = scheduler.start("Is free will real?").await {
        eprintln!("failed to start the debate: {}", e);
        return;
    }

    while let Ok(event) = events.recv().await {
        match event {
            SessionEvent::MessageAppended { message } => {
                println!("[{}] {}", message.speaker, message.content);
            }
            SessionEvent::TurnCountChanged { turn_count } => {
                if turn_count > 0 {
                    println!("  (turn {})", turn_count);
                }
            }
            SessionEvent::StateChanged { state } => {
                println!("-- state: {:?}", state);
                if state == SessionState::Stopped {
                    break;
                }
            }
        }
    }

    println!("--- Debate Finished ---");
}
