//! Session orchestration for RoomWarden.
//!
//! Decides when the agent joins a room, how it reacts to people arriving
//! and leaving, how often video frames reach the model, and how tool calls
//! are run and answered.
//!
//! - [`occupancy`]: wait for someone to be in the room before joining
//! - [`controller`]: the lifecycle state machine, greeting and empty-room shutdown
//! - [`sampler`]: voice-activity-adaptive frame sampling
//! - [`presence`] and [`timer`]: the state the controller owns

pub mod controller;
pub mod occupancy;
pub mod presence;
pub mod sampler;
pub mod settings;
pub mod timer;

pub use controller::{SessionController, SessionHandle, SessionOutcome};
pub use occupancy::{OccupancyOutcome, await_occupant};
pub use presence::{PresenceChange, RoomPresence};
pub use sampler::{AdaptiveVideoSampler, VideoGate, VideoSamplingPolicy, run_video_pump};
pub use settings::{OccupancySettings, SessionSettings};
