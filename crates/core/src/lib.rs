//! # RoomWarden Core
//!
//! Domain types, collaborator traits, and error definitions for the
//! RoomWarden session controller. This crate defines the model every other
//! crate implements against.
//!
//! ## Design Philosophy
//!
//! Everything outside the controller (the room platform, the multimodal
//! model, the video output) is a trait here. Implementations live with the
//! platform integration, which keeps:
//! - the controller testable with in-process fakes
//! - the dependency graph pointing inward on core

pub mod error;
pub mod tool;
pub mod room;
pub mod conversation;
pub mod media;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{ConversationError, Error, Result, RoomError, ToolError};
pub use tool::{
    Tool, ToolCall, ToolDefinition, ToolErrorDescriptor, ToolInvocation, ToolKind, ToolOutcome,
    ToolRegistry, ToolReply,
};
pub use room::{Participant, ParticipantKind, RoomClient};
pub use conversation::Conversation;
pub use media::{FrameSink, VideoFrame};
pub use event::{EventBus, SessionEvent, SessionState, TimerKind};
