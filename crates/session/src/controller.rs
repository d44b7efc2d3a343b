//! Session lifecycle controller.
//!
//! The controller is an actor: it owns `SessionState`, `RoomPresence` and
//! both timer slots, and only its own event loop mutates them. Everything
//! else talks to it through a [`SessionHandle`]. Each loop turn takes one
//! mailbox command, drains whatever else is already queued, and only then
//! reconciles timers, so a room that empties and refills inside one batch
//! never arms a shutdown.
//!
//! ```text
//! Waiting ──guard──▶ Connecting ──join──▶ Active ◀──join──┐
//!                                           │             │
//!                                    last leave ──▶ EmptyPending
//!                                                         │
//!                                          shutdown timer ▼
//!                                                     Terminated
//! ```

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use roomwarden_config::OccupancyTimeoutPolicy;
use roomwarden_core::conversation::Conversation;
use roomwarden_core::error::{Error, Result, RoomError};
use roomwarden_core::event::{EventBus, SessionEvent, SessionState, TimerKind};
use roomwarden_core::media::{FrameSink, VideoFrame};
use roomwarden_core::room::{Participant, RoomClient};
use roomwarden_core::tool::{ToolCall, ToolErrorDescriptor, ToolKind, ToolOutcome, ToolReply};
use roomwarden_tools::ToolDispatcher;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::occupancy::{self, OccupancyOutcome};
use crate::presence::{PresenceChange, RoomPresence};
use crate::sampler::{AdaptiveVideoSampler, VideoGate, VideoSamplingPolicy, run_video_pump};
use crate::settings::SessionSettings;
use crate::timer::{TimerFired, TimerSlot};

const MAILBOX_CAPACITY: usize = 256;

#[derive(Debug)]
enum SessionCommand {
    ParticipantJoined(Participant),
    ParticipantLeft(Participant),
    ToolCall(ToolCall),
    RoomFailed(RoomError),
    Shutdown,
}

/// How a session ended, when it ended normally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The room stayed empty for the shutdown delay.
    RoomEmpty { room_closed: bool },
    /// Nobody arrived in time and the policy is to abort.
    OccupancyTimedOut,
    /// Stopped on request, or every handle was dropped.
    Stopped,
}

enum Exit {
    Done(SessionOutcome),
    Failed(RoomError),
}

impl Exit {
    fn into_result(self) -> Result<SessionOutcome> {
        match self {
            Exit::Done(outcome) => Ok(outcome),
            Exit::Failed(e) => Err(Error::Room(e)),
        }
    }
}

/// What a finished tool task reports back to the controller.
struct ToolReport {
    call_id: String,
    tool: String,
    success: bool,
    duration_ms: u64,
}

/// The platform integration's way into a running session.
///
/// Dropping every handle stops the session.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: String,
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
    video: VideoGate,
    video_policy: VideoSamplingPolicy,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn participant_joined(&self, participant: Participant) -> Result<()> {
        self.send(SessionCommand::ParticipantJoined(participant)).await
    }

    pub async fn participant_left(&self, participant: Participant) -> Result<()> {
        self.send(SessionCommand::ParticipantLeft(participant)).await
    }

    /// Submit a tool call from the model. The reply goes to the
    /// conversation, paired by `call.id`.
    pub async fn tool_call(&self, call: ToolCall) -> Result<()> {
        self.send(SessionCommand::ToolCall(call)).await
    }

    /// Report a room-platform failure. Fatal errors end the session.
    pub async fn room_failed(&self, error: RoomError) -> Result<()> {
        self.send(SessionCommand::RoomFailed(error)).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown).await
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// The shared video toggle and voice-activity flag.
    pub fn video(&self) -> &VideoGate {
        &self.video
    }

    /// Start sampling `frames` into `sink` at the session's cadence.
    ///
    /// The pump stops when the frame stream ends or the session terminates.
    pub fn attach_video(
        &self,
        frames: mpsc::Receiver<VideoFrame>,
        sink: Arc<dyn FrameSink>,
    ) -> JoinHandle<usize> {
        let sampler = AdaptiveVideoSampler::new(self.video_policy, self.video.clone());
        let mut state = self.state.clone();
        let terminated = async move {
            // A dropped sender means the controller is gone as well.
            let _ = state.wait_for(|s| *s == SessionState::Terminated).await;
        };
        tokio::spawn(run_video_pump(sampler, frames, sink, terminated))
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::Internal(format!("session {} has ended", self.session_id)))
    }
}

pub struct SessionController {
    session_id: String,
    settings: SessionSettings,
    room: Arc<dyn RoomClient>,
    conversation: Arc<dyn Conversation>,
    dispatcher: Arc<ToolDispatcher>,
    events: Arc<EventBus>,
    video: VideoGate,

    commands: mpsc::Receiver<SessionCommand>,
    state_tx: watch::Sender<SessionState>,
    state: SessionState,
    presence: RoomPresence,

    greeting: TimerSlot,
    shutdown: TimerSlot,
    greeting_scheduled: bool,
    greeting_task: Option<JoinHandle<()>>,
    timer_tx: mpsc::UnboundedSender<TimerFired>,
    timer_rx: mpsc::UnboundedReceiver<TimerFired>,

    tools: JoinSet<ToolReport>,
}

impl SessionController {
    pub fn new(
        settings: SessionSettings,
        room: Arc<dyn RoomClient>,
        conversation: Arc<dyn Conversation>,
        dispatcher: Arc<ToolDispatcher>,
        events: Arc<EventBus>,
    ) -> (Self, SessionHandle) {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (commands_tx, commands) = mpsc::channel(MAILBOX_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SessionState::Waiting);
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let video = VideoGate::new(settings.video_enabled);

        let handle = SessionHandle {
            session_id: session_id.clone(),
            commands: commands_tx,
            state: state_rx,
            video: video.clone(),
            video_policy: settings.video,
        };

        let controller = Self {
            session_id,
            settings,
            room,
            conversation,
            dispatcher,
            events,
            video,
            commands,
            state_tx,
            state: SessionState::Waiting,
            presence: RoomPresence::new(),
            greeting: TimerSlot::new(TimerKind::Greeting),
            shutdown: TimerSlot::new(TimerKind::Shutdown),
            greeting_scheduled: false,
            greeting_task: None,
            timer_tx,
            timer_rx,
            tools: JoinSet::new(),
        };

        (controller, handle)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Drive the session to completion.
    ///
    /// Returns the normal outcome, or the fatal room error that ended it.
    /// Either way the published state is `Terminated` afterwards.
    pub async fn run(mut self) -> Result<SessionOutcome> {
        info!(
            session_id = %self.session_id,
            room = self.room.room_name(),
            "Session starting"
        );

        let result = self.drive().await;
        self.teardown();

        match &result {
            Ok(outcome) => info!(session_id = %self.session_id, ?outcome, "Session ended"),
            Err(e) => error!(session_id = %self.session_id, error = %e, "Session failed"),
        }
        result
    }

    async fn drive(&mut self) -> Result<SessionOutcome> {
        let room = self.room.clone();
        let agent_identity = self.settings.agent_identity.clone();
        let guard_settings = self.settings.occupancy.clone();
        let guard = async move {
            occupancy::await_occupant(room.as_ref(), &agent_identity, &guard_settings).await
        };

        let early = self.conversation.clone();
        match interruptible(&mut self.commands, &mut self.tools, &early, guard).await {
            Err(exit) => return exit.into_result(),
            Ok(OccupancyOutcome::Proceed) => {}
            Ok(OccupancyOutcome::TimedOut) => match self.settings.occupancy.on_timeout {
                OccupancyTimeoutPolicy::Join => {
                    info!(
                        session_id = %self.session_id,
                        "No occupant arrived in time, joining anyway"
                    );
                }
                OccupancyTimeoutPolicy::Abort => {
                    info!(session_id = %self.session_id, "No occupant arrived in time, aborting");
                    return Ok(SessionOutcome::OccupancyTimedOut);
                }
            },
        }

        self.transition(SessionState::Connecting);
        let room = self.room.clone();
        let joining = async move { room.join().await };
        match interruptible(&mut self.commands, &mut self.tools, &early, joining).await {
            Err(exit) => return exit.into_result(),
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(())) => {}
        }

        self.seed_presence().await;
        self.transition(SessionState::Active);
        self.reconcile(false);

        self.event_loop().await.into_result()
    }

    /// Record everyone already in the room as joined.
    async fn seed_presence(&mut self) {
        match self.room.list_participants().await {
            Ok(participants) => {
                for participant in &participants {
                    if participant.is_occupant(&self.settings.agent_identity) {
                        self.presence.join(&participant.identity);
                    }
                }
            }
            Err(e) => warn!(error = %e, "Could not list participants after joining"),
        }
        info!(
            session_id = %self.session_id,
            occupants = self.presence.occupant_count(),
            "Joined room"
        );
    }

    async fn event_loop(&mut self) -> Exit {
        let mut resync = self.settings.presence_resync.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    let Some(command) = command else {
                        info!(session_id = %self.session_id, "All session handles dropped");
                        return Exit::Done(SessionOutcome::Stopped);
                    };
                    if let ControlFlow::Break(exit) = self.process_batch(command) {
                        return exit;
                    }
                }

                Some(fired) = self.timer_rx.recv() => {
                    if let ControlFlow::Break(exit) = self.on_timer(fired).await {
                        return exit;
                    }
                }

                Some(finished) = self.tools.join_next(), if !self.tools.is_empty() => {
                    self.on_tool_finished(finished);
                }

                () = next_tick(&mut resync), if resync.is_some() => {
                    self.resync_presence().await;
                }
            }
        }
    }

    /// Replace presence with the room's own listing, catching joins and
    /// leaves whose notifications never arrived.
    async fn resync_presence(&mut self) {
        let participants = match self.room.list_participants().await {
            Ok(participants) => participants,
            Err(e) => {
                warn!(error = %e, "Could not list participants for resync");
                return;
            }
        };
        let agent_identity = &self.settings.agent_identity;
        let occupants = participants
            .into_iter()
            .filter(|p| p.is_occupant(agent_identity))
            .map(|p| p.identity);
        let before = self.presence.occupant_count();
        let change = self.presence.sync(occupants, Instant::now());
        let after = self.presence.occupant_count();
        if change != PresenceChange::Unchanged || before != after {
            info!(
                session_id = %self.session_id,
                before,
                after,
                "Presence resynced from room listing"
            );
        }
        self.reconcile(change == PresenceChange::BecameEmpty);
    }

    /// Apply `first` and everything already queued behind it, then reconcile.
    fn process_batch(&mut self, first: SessionCommand) -> ControlFlow<Exit> {
        let mut emptied = false;
        let mut next = Some(first);
        while let Some(command) = next {
            match self.apply(command) {
                ControlFlow::Continue(change) => emptied |= change == PresenceChange::BecameEmpty,
                ControlFlow::Break(exit) => return ControlFlow::Break(exit),
            }
            next = self.commands.try_recv().ok();
        }
        self.reconcile(emptied);
        ControlFlow::Continue(())
    }

    fn apply(&mut self, command: SessionCommand) -> ControlFlow<Exit, PresenceChange> {
        match command {
            SessionCommand::ParticipantJoined(participant) => {
                if !participant.is_occupant(&self.settings.agent_identity) {
                    debug!(identity = %participant.identity, "Ignoring non-occupant join");
                    return ControlFlow::Continue(PresenceChange::Unchanged);
                }
                let change = self.presence.join(&participant.identity);
                info!(
                    identity = %participant.identity,
                    occupants = self.presence.occupant_count(),
                    "Participant joined"
                );
                ControlFlow::Continue(change)
            }
            SessionCommand::ParticipantLeft(participant) => {
                if !participant.is_occupant(&self.settings.agent_identity) {
                    debug!(identity = %participant.identity, "Ignoring non-occupant leave");
                    return ControlFlow::Continue(PresenceChange::Unchanged);
                }
                let change = self.presence.leave(&participant.identity, Instant::now());
                info!(
                    identity = %participant.identity,
                    occupants = self.presence.occupant_count(),
                    "Participant left"
                );
                ControlFlow::Continue(change)
            }
            SessionCommand::ToolCall(call) => {
                self.start_tool_call(call);
                ControlFlow::Continue(PresenceChange::Unchanged)
            }
            SessionCommand::RoomFailed(e) if e.is_fatal() => {
                error!(session_id = %self.session_id, error = %e, "Fatal room error");
                ControlFlow::Break(Exit::Failed(e))
            }
            SessionCommand::RoomFailed(e) => {
                warn!(session_id = %self.session_id, error = %e, "Room error, continuing");
                ControlFlow::Continue(PresenceChange::Unchanged)
            }
            SessionCommand::Shutdown => {
                info!(session_id = %self.session_id, "Shutdown requested");
                ControlFlow::Break(Exit::Done(SessionOutcome::Stopped))
            }
        }
    }

    /// Bring timers and state in line with presence after a batch.
    fn reconcile(&mut self, emptied: bool) {
        let occupied = !self.presence.is_empty();

        match self.state {
            SessionState::Active if emptied && !occupied => {
                if self.settings.terminate_on_empty {
                    self.arm(TimerKind::Shutdown);
                    self.transition(SessionState::EmptyPending);
                } else {
                    info!(session_id = %self.session_id, "Room is empty, staying active");
                }
            }
            SessionState::EmptyPending if occupied => {
                self.cancel(TimerKind::Shutdown);
                self.transition(SessionState::Active);
            }
            _ => {}
        }

        if emptied && !occupied && self.greeting.is_armed() {
            // Nobody is left to greet; the next arrival arms it again.
            self.cancel(TimerKind::Greeting);
            self.greeting_scheduled = false;
        }

        if occupied && !self.greeting_scheduled {
            self.greeting_scheduled = true;
            self.arm(TimerKind::Greeting);
        }
    }

    async fn on_timer(&mut self, fired: TimerFired) -> ControlFlow<Exit> {
        let claimed = match fired.kind {
            TimerKind::Greeting => self.greeting.claim(fired),
            TimerKind::Shutdown => self.shutdown.claim(fired),
        };
        if !claimed {
            debug!(timer = ?fired.kind, generation = fired.generation, "Ignoring stale timer");
            return ControlFlow::Continue(());
        }

        info!(session_id = %self.session_id, timer = ?fired.kind, "Timer fired");
        self.events.publish(SessionEvent::TimerFired {
            kind: fired.kind,
            timestamp: Utc::now(),
        });

        match fired.kind {
            TimerKind::Greeting => {
                self.start_greeting();
                ControlFlow::Continue(())
            }
            TimerKind::Shutdown => self.on_shutdown_timer().await,
        }
    }

    async fn on_shutdown_timer(&mut self) -> ControlFlow<Exit> {
        if self.state != SessionState::EmptyPending || !self.presence.is_empty() {
            warn!(
                state = %self.state,
                occupants = self.presence.occupant_count(),
                "Shutdown timer fired for an occupied room, staying up"
            );
            if !self.presence.is_empty() {
                self.transition(SessionState::Active);
            }
            return ControlFlow::Continue(());
        }

        let room_closed = if self.settings.close_room_on_empty {
            self.close_room().await
        } else {
            false
        };
        ControlFlow::Break(Exit::Done(SessionOutcome::RoomEmpty { room_closed }))
    }

    async fn close_room(&self) -> bool {
        let room = self.room.room_name().to_string();
        let success = match self.room.close_room().await {
            Ok(()) => {
                info!(room = %room, "Room closed");
                true
            }
            Err(e) => {
                warn!(room = %room, error = %e, "Failed to close room, shutting down anyway");
                false
            }
        };
        self.events.publish(SessionEvent::RoomClosed {
            room,
            success,
            timestamp: Utc::now(),
        });
        success
    }

    fn start_greeting(&mut self) {
        let task = deliver_greeting(
            self.conversation.clone(),
            self.events.clone(),
            self.settings.greeting_attempts,
            self.settings.greeting_backoff,
        );
        self.greeting_task = Some(tokio::spawn(task));
    }

    fn start_tool_call(&mut self, call: ToolCall) {
        let conversation = self.conversation.clone();

        let control = call
            .name
            .parse::<ToolKind>()
            .ok()
            .filter(ToolKind::is_session_control);
        if let Some(kind) = control {
            let reply = self.toggle_video(kind, call);
            self.tools.spawn(deliver_reply(conversation, reply, Duration::ZERO));
            return;
        }

        let invocation = self.dispatcher.prepare(call);
        info!(
            call_id = %invocation.id,
            tool = %invocation.name,
            deadline_ms = invocation.deadline.as_millis() as u64,
            "Dispatching tool call"
        );
        let dispatcher = self.dispatcher.clone();
        self.tools.spawn(async move {
            let started = Instant::now();
            let reply = dispatcher.invoke(invocation).await;
            deliver_reply(conversation, reply, started.elapsed()).await
        });
    }

    fn toggle_video(&mut self, kind: ToolKind, call: ToolCall) -> ToolReply {
        let enable = kind == ToolKind::EnableVideo;
        let changed = self.video.set_enabled(enable) != enable;
        if changed {
            info!(session_id = %self.session_id, enabled = enable, "Video toggled");
            self.events.publish(SessionEvent::VideoToggled {
                enabled: enable,
                timestamp: Utc::now(),
            });
        }
        ToolReply {
            call_id: call.id,
            tool: call.name,
            outcome: ToolOutcome::Success {
                payload: serde_json::json!({ "video_enabled": enable, "changed": changed }),
            },
        }
    }

    fn on_tool_finished(&mut self, finished: std::result::Result<ToolReport, JoinError>) {
        match finished {
            Ok(report) => self.events.publish(SessionEvent::ToolCompleted {
                call_id: report.call_id,
                tool: report.tool,
                success: report.success,
                duration_ms: report.duration_ms,
                timestamp: Utc::now(),
            }),
            Err(e) if e.is_cancelled() => {}
            Err(e) => error!(error = %e, "Tool task panicked"),
        }
    }

    fn arm(&mut self, kind: TimerKind) {
        let (slot, delay) = match kind {
            TimerKind::Greeting => (&mut self.greeting, self.settings.greeting_delay),
            TimerKind::Shutdown => (&mut self.shutdown, self.settings.shutdown_delay),
        };
        if !slot.arm(delay, &self.timer_tx) {
            debug!(timer = ?kind, "Timer already armed");
            return;
        }

        let delay_ms = delay.as_millis() as u64;
        info!(session_id = %self.session_id, timer = ?kind, delay_ms, "Timer armed");
        self.events.publish(SessionEvent::TimerArmed {
            kind,
            delay_ms,
            timestamp: Utc::now(),
        });
    }

    fn cancel(&mut self, kind: TimerKind) {
        let cancelled = match kind {
            TimerKind::Greeting => self.greeting.cancel(),
            TimerKind::Shutdown => self.shutdown.cancel(),
        };
        if cancelled {
            info!(session_id = %self.session_id, timer = ?kind, "Timer cancelled");
            self.events.publish(SessionEvent::TimerCancelled {
                kind,
                timestamp: Utc::now(),
            });
        }
    }

    fn teardown(&mut self) {
        self.cancel(TimerKind::Greeting);
        self.cancel(TimerKind::Shutdown);
        if let Some(task) = self.greeting_task.take() {
            task.abort();
        }
        self.tools.abort_all();
        self.transition(SessionState::Terminated);
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        info!(session_id = %self.session_id, %from, %to, "Session state changed");
        self.state_tx.send_replace(to);
        self.events.publish(SessionEvent::StateChanged {
            session_id: self.session_id.clone(),
            from,
            to,
            timestamp: Utc::now(),
        });
    }
}

/// Run `work` unless a stop or fatal room error arrives first.
///
/// Tool calls are answered at once with a `session_not_active` error so the
/// model is never left waiting. Presence events are dropped: the room is
/// listed once joined.
async fn interruptible<F: Future>(
    commands: &mut mpsc::Receiver<SessionCommand>,
    tools: &mut JoinSet<ToolReport>,
    conversation: &Arc<dyn Conversation>,
    work: F,
) -> std::result::Result<F::Output, Exit> {
    tokio::pin!(work);
    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                None | Some(SessionCommand::Shutdown) => {
                    return Err(Exit::Done(SessionOutcome::Stopped));
                }
                Some(SessionCommand::RoomFailed(e)) if e.is_fatal() => {
                    return Err(Exit::Failed(e));
                }
                Some(SessionCommand::ToolCall(call)) => {
                    info!(
                        call_id = %call.id,
                        tool = %call.name,
                        "Tool call before the session is active"
                    );
                    let reply = not_active_reply(call);
                    tools.spawn(deliver_reply(conversation.clone(), reply, Duration::ZERO));
                }
                Some(other) => {
                    debug!(command = ?other, "Ignoring command before the room is joined");
                }
            },

            output = &mut work => return Ok(output),
        }
    }
}

fn not_active_reply(call: ToolCall) -> ToolReply {
    ToolReply {
        call_id: call.id,
        tool: call.name,
        outcome: ToolOutcome::Error {
            error: ToolErrorDescriptor {
                message: "session is not active yet, retry once the room is joined".into(),
                code: Some("session_not_active".into()),
            },
        },
    }
}

/// Resolves on the next resync tick, or never when resync is disabled.
async fn next_tick(resync: &mut Option<Interval>) {
    match resync {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn deliver_greeting(
    conversation: Arc<dyn Conversation>,
    events: Arc<EventBus>,
    attempts: u32,
    backoff: Duration,
) {
    for attempt in 1..=attempts {
        match conversation.greet().await {
            Ok(()) => {
                info!(attempt, "Greeting delivered");
                events.publish(SessionEvent::GreetingDelivered {
                    attempts: attempt,
                    timestamp: Utc::now(),
                });
                return;
            }
            Err(e) if attempt < attempts => {
                warn!(attempt, error = %e, "Greeting failed, retrying");
                tokio::time::sleep(backoff * attempt).await;
            }
            Err(e) => {
                warn!(attempt, error = %e, "Greeting failed, giving up");
                events.publish(SessionEvent::GreetingFailed {
                    attempts: attempt,
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }
}

async fn deliver_reply(
    conversation: Arc<dyn Conversation>,
    reply: ToolReply,
    elapsed: Duration,
) -> ToolReport {
    let report = ToolReport {
        call_id: reply.call_id.clone(),
        tool: reply.tool.clone(),
        success: reply.outcome.is_success(),
        duration_ms: elapsed.as_millis() as u64,
    };
    if let Err(e) = conversation.deliver_tool_result(reply).await {
        warn!(call_id = %report.call_id, error = %e, "Could not deliver tool result");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomwarden_core::error::ConversationError;

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(SessionOutcome::RoomEmpty { room_closed: true }).unwrap();
        assert_eq!(json["outcome"], "room_empty");
        assert_eq!(json["room_closed"], true);
    }

    struct NullConversation;

    #[async_trait::async_trait]
    impl Conversation for NullConversation {
        async fn greet(&self) -> std::result::Result<(), ConversationError> {
            Ok(())
        }

        async fn deliver_tool_result(
            &self,
            _reply: ToolReply,
        ) -> std::result::Result<(), ConversationError> {
            Ok(())
        }
    }

    fn null_conversation() -> Arc<dyn Conversation> {
        Arc::new(NullConversation)
    }

    #[tokio::test]
    async fn interruptible_returns_work_output() {
        let (_tx, mut rx) = mpsc::channel(4);
        let mut tools = JoinSet::new();
        let out = interruptible(&mut rx, &mut tools, &null_conversation(), async { 7 }).await;
        assert!(matches!(out, Ok(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn interruptible_answers_tool_calls() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut tools = JoinSet::new();
        tx.send(SessionCommand::ToolCall(ToolCall {
            id: "early-1".into(),
            name: "get_current_time".into(),
            arguments: serde_json::json!({}),
        }))
        .await
        .unwrap();
        tx.send(SessionCommand::Shutdown).await.unwrap();

        let pending = std::future::pending::<()>();
        let out = interruptible(&mut rx, &mut tools, &null_conversation(), pending).await;
        assert!(matches!(out, Err(Exit::Done(SessionOutcome::Stopped))));

        let report = tools.join_next().await.unwrap().unwrap();
        assert_eq!(report.call_id, "early-1");
        assert!(!report.success);
    }

    #[tokio::test(start_paused = true)]
    async fn interruptible_stops_on_shutdown() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(SessionCommand::ParticipantJoined(Participant::standard("early")))
            .await
            .unwrap();
        tx.send(SessionCommand::Shutdown).await.unwrap();
        let mut tools = JoinSet::new();
        let pending = std::future::pending::<()>();
        let out = interruptible(&mut rx, &mut tools, &null_conversation(), pending).await;
        assert!(matches!(out, Err(Exit::Done(SessionOutcome::Stopped))));
    }

    #[tokio::test(start_paused = true)]
    async fn interruptible_stops_on_fatal_room_error_only() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(SessionCommand::RoomFailed(RoomError::Transport("blip".into())))
            .await
            .unwrap();
        tx.send(SessionCommand::RoomFailed(RoomError::AuthenticationFailed(
            "token expired".into(),
        )))
        .await
        .unwrap();
        let mut tools = JoinSet::new();
        let pending = std::future::pending::<()>();
        let out = interruptible(&mut rx, &mut tools, &null_conversation(), pending).await;
        assert!(matches!(
            out,
            Err(Exit::Failed(RoomError::AuthenticationFailed(_)))
        ));
    }
}
