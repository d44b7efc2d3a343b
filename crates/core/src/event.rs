//! Session events: what the controller reports while it runs.
//!
//! Events are published when the session changes state, arms or drops a
//! timer, greets, or finishes a tool call. Observers subscribe without the
//! controller knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Lifecycle state of the single session a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Waiting,
    Connecting,
    Active,
    EmptyPending,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Waiting => "waiting",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::EmptyPending => "empty_pending",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// The controller's cancelable one-shot timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Greeting,
    Shutdown,
}

/// All session events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged {
        session_id: String,
        from: SessionState,
        to: SessionState,
        timestamp: DateTime<Utc>,
    },

    TimerArmed {
        kind: TimerKind,
        delay_ms: u64,
        timestamp: DateTime<Utc>,
    },

    TimerCancelled {
        kind: TimerKind,
        timestamp: DateTime<Utc>,
    },

    TimerFired {
        kind: TimerKind,
        timestamp: DateTime<Utc>,
    },

    GreetingDelivered {
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    GreetingFailed {
        attempts: u32,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    ToolCompleted {
        call_id: String,
        tool: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    VideoToggled {
        enabled: bool,
        timestamp: DateTime<Utc>,
    },

    RoomClosed {
        room: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for session events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Slow
/// subscribers lag and lose the oldest events; the controller never blocks
/// on them.
pub struct EventBus {
    sender: broadcast::Sender<Arc<SessionEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SessionEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
