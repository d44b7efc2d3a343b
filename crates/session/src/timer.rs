//! One-shot cancelable timers owned by the controller.
//!
//! A [`TimerSlot`] holds at most one pending timer. The timer task only
//! sleeps and then posts a [`TimerFired`] tagged with the generation it was
//! armed with; the controller acts on it only if the slot still holds that
//! generation. Arm, cancel and fire therefore all happen on the controller's
//! event path, and a cancel that is processed first always wins.

use std::time::Duration;

use roomwarden_core::event::TimerKind;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

#[derive(Debug)]
struct PendingTimer {
    generation: u64,
    armed_at: Instant,
    delay: Duration,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
pub struct TimerSlot {
    kind: TimerKind,
    next_generation: u64,
    pending: Option<PendingTimer>,
}

impl TimerSlot {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            next_generation: 0,
            pending: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending timer is due, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.armed_at + p.delay)
    }

    /// Arm the timer. A no-op returning `false` if one is already pending.
    pub fn arm(&mut self, delay: Duration, fired: &mpsc::UnboundedSender<TimerFired>) -> bool {
        if self.pending.is_some() {
            return false;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let kind = self.kind;
        let tx = fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(TimerFired { kind, generation });
        });

        self.pending = Some(PendingTimer {
            generation,
            armed_at: Instant::now(),
            delay,
            handle,
        });
        true
    }

    /// Cancel the pending timer. Returns `false` if nothing was armed.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Claim a fire notification. `true` only for the currently armed
    /// generation; the slot is then empty.
    pub fn claim(&mut self, fired: TimerFired) -> bool {
        let current = self
            .pending
            .as_ref()
            .is_some_and(|p| fired.kind == self.kind && p.generation == fired.generation);
        if current {
            self.pending = None;
        }
        current
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
