//! Conversation trait: the outbound half of the model collaborator.
//!
//! The multimodal model owns speech, vision and tool-call generation. The
//! session controller only needs two things from it: a way to speak the
//! greeting and a way to hand tool results back into the conversation.

use async_trait::async_trait;

use crate::error::ConversationError;
use crate::tool::ToolReply;

#[async_trait]
pub trait Conversation: Send + Sync {
    /// Produce the spoken greeting and wait until it has been played out.
    async fn greet(&self) -> Result<(), ConversationError>;

    /// Relay a tool result (payload or verbatim error) to the model.
    async fn deliver_tool_result(&self, reply: ToolReply) -> Result<(), ConversationError>;
}
