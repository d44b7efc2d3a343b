//! Occupancy guard: hold off joining until someone is there to talk to.

use roomwarden_core::error::RoomError;
use roomwarden_core::room::RoomClient;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::settings::OccupancySettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyOutcome {
    Proceed,
    TimedOut,
}

/// Poll the room until an occupant is present or the timeout elapses.
///
/// A room that does not exist yet counts as empty. Any other poll error is
/// logged and retried at the same interval. With the guard disabled this
/// returns `Proceed` without polling.
pub async fn await_occupant(
    room: &dyn RoomClient,
    agent_identity: &str,
    settings: &OccupancySettings,
) -> OccupancyOutcome {
    if !settings.enabled {
        debug!("Occupancy guard disabled");
        return OccupancyOutcome::Proceed;
    }

    let deadline = settings.timeout.map(|timeout| Instant::now() + timeout);
    let mut announced = false;
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        let poll = room.list_participants();
        let polled = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, poll).await.ok(),
            None => Some(poll.await),
        };

        match polled {
            Some(Ok(participants)) => {
                if participants.iter().any(|p| p.is_occupant(agent_identity)) {
                    info!(room = room.room_name(), attempt, "Occupant present, proceeding");
                    return OccupancyOutcome::Proceed;
                }
                if !announced {
                    info!(room = room.room_name(), "Waiting for an occupant before joining");
                    announced = true;
                }
            }
            Some(Err(RoomError::NotFound(_))) => {
                if !announced {
                    info!(room = room.room_name(), "Room not created yet, waiting for an occupant");
                    announced = true;
                }
            }
            Some(Err(e)) => {
                warn!(
                    room = room.room_name(),
                    attempt,
                    error = %e,
                    "Occupancy poll failed, retrying"
                );
            }
            None => {}
        }

        let now = Instant::now();
        let next_poll = now + settings.poll_interval;
        match deadline {
            Some(deadline) if now >= deadline => {
                info!(room = room.room_name(), attempt, "Timed out waiting for an occupant");
                return OccupancyOutcome::TimedOut;
            }
            Some(deadline) => tokio::time::sleep_until(next_poll.min(deadline)).await,
            None => tokio::time::sleep_until(next_poll).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roomwarden_config::OccupancyTimeoutPolicy;
    use roomwarden_core::room::{Participant, ParticipantKind};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays scripted poll results; repeats the last one forever.
    struct ScriptedRoom {
        script: Mutex<VecDeque<Result<Vec<Participant>, RoomError>>>,
        polls: AtomicUsize,
    }

    impl ScriptedRoom {
        fn new(script: Vec<Result<Vec<Participant>, RoomError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RoomClient for ScriptedRoom {
        fn room_name(&self) -> &str {
            "lobby"
        }
        async fn list_participants(&self) -> Result<Vec<Participant>, RoomError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }
        async fn join(&self) -> Result<(), RoomError> {
            Ok(())
        }
        async fn close_room(&self) -> Result<(), RoomError> {
            Ok(())
        }
    }

    fn settings(timeout: Option<u64>) -> OccupancySettings {
        OccupancySettings {
            enabled: true,
            poll_interval: Duration::from_secs(2),
            timeout: timeout.map(Duration::from_secs),
            on_timeout: OccupancyTimeoutPolicy::Join,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_guard_never_polls() {
        let room = ScriptedRoom::new(vec![Ok(vec![])]);
        let mut s = settings(None);
        s.enabled = false;
        assert_eq!(await_occupant(&room, "agent", &s).await, OccupancyOutcome::Proceed);
        assert_eq!(room.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn proceeds_once_an_occupant_appears() {
        let room = ScriptedRoom::new(vec![
            Err(RoomError::NotFound("lobby".into())),
            Ok(vec![Participant::standard("agent")]),
            Err(RoomError::Transport("connection reset".into())),
            Ok(vec![Participant::standard("alice")]),
        ]);
        let started = Instant::now();
        assert_eq!(
            await_occupant(&room, "agent", &settings(None)).await,
            OccupancyOutcome::Proceed
        );
        assert_eq!(room.polls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn helpers_do_not_count() {
        let egress = Participant {
            identity: "recorder".into(),
            kind: ParticipantKind::Egress,
            publish_on_behalf: None,
        };
        let room = ScriptedRoom::new(vec![Ok(vec![egress])]);
        assert_eq!(
            await_occupant(&room, "agent", &settings(Some(5))).await,
            OccupancyOutcome::TimedOut
        );
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_wait_times_out() {
        let room = ScriptedRoom::new(vec![Ok(vec![])]);
        let started = Instant::now();
        assert_eq!(
            await_occupant(&room, "agent", &settings(Some(5))).await,
            OccupancyOutcome::TimedOut
        );
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        // Polls at 0s, 2s, 4s and a final one at the deadline.
        assert_eq!(room.polls.load(Ordering::SeqCst), 4);
    }
}
