//! Session event loop
//!
//! Owns a started [`RecordingSession`] and applies clock ticks and channel
//! events to it one at a time until it stops.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::channel::{EventReceiver, SessionEvent};
use super::session::RecordingSession;
use super::state::{SessionState, SessionStatus, StopReason};
use crate::delivery::DeliveryAdapter;

/// Drive `session` until it reaches `Stopped`, then hand its artifact to
/// `delivery`. Returns the stopped session.
pub async fn run_session(
    mut session: RecordingSession,
    mut events: EventReceiver,
    tick_period: Duration,
    status: Arc<watch::Sender<SessionStatus>>,
    delivery: Arc<DeliveryAdapter>,
) -> RecordingSession {
    let mut clock = interval_at(Instant::now() + tick_period, tick_period);
    clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

    status.send_replace(session.status());

    while session.state() == SessionState::Recording {
        tokio::select! {
            biased;

            event = events.recv() => match event {
                Some(event) => {
                    session.handle(event);
                }
                None => {
                    tracing::warn!("Event channel of session {} closed, stopping", session.id());
                    session.stop(StopReason::User);
                }
            },
            _ = clock.tick() => {
                session.handle(SessionEvent::Tick);
            }
        }

        if session.state() == SessionState::Recording {
            status.send_replace(session.status());
        }
    }

    // Emission is halted; anything still queued is stale
    events.close();

    // Observers that see Stopped can read the artifact right away
    if let Some(artifact) = session.take_artifact() {
        delivery.replace(artifact);
    }
    status.send_replace(session.status());

    tracing::debug!("Session {} event loop finished", session.id());
    session
}
