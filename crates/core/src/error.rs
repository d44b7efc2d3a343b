//! Error types for the RoomWarden domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all RoomWarden operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Room collaborator errors ---
    #[error("Room error: {0}")]
    Room(#[from] RoomError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Model collaborator errors ---
    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by the real-time communication platform.
#[derive(Debug, Clone, Error)]
pub enum RoomError {
    #[error("Room not found: {0}")]
    NotFound(String),

    #[error("Room authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Room connection lost: {0}")]
    ConnectionLost(String),

    #[error("Room API request failed: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("Room transport error: {0}")]
    Transport(String),
}

impl RoomError {
    /// Whether this error ends the session.
    ///
    /// Fatal errors are propagated out of the controller; everything else is
    /// treated as transient by the callers that can retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RoomError::AuthenticationFailed(_) | RoomError::ConnectionLost(_)
        )
    }
}

/// Failures from the multimodal model collaborator.
#[derive(Debug, Clone, Error)]
pub enum ConversationError {
    #[error("Model session not ready: {0}")]
    NotReady(String),

    #[error("Model request timed out: {0}")]
    Timeout(String),

    #[error("Model stream closed: {0}")]
    Closed(String),
}

/// Tool failures.
///
/// The `Display` output of every variant that wraps an upstream failure is
/// the upstream text itself. It is relayed to the conversation as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    NotFound(String),

    #[error("tool is disabled: {0}")]
    Disabled(String),

    #[error("{tool_name} did not complete within {deadline_ms}ms")]
    Timeout { tool_name: String, deadline_ms: u64 },

    #[error("{0}")]
    InvalidArguments(String),

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Malformed(String),
}

impl ToolError {
    /// Machine-readable code reported alongside the message.
    pub fn code(&self) -> Option<String> {
        match self {
            ToolError::NotFound(_) => Some("unknown_tool".into()),
            ToolError::Disabled(_) => Some("tool_disabled".into()),
            ToolError::Timeout { .. } => Some("timeout".into()),
            ToolError::InvalidArguments(_) => Some("invalid_arguments".into()),
            ToolError::Remote { status, .. } => Some(status.to_string()),
            ToolError::Transport(_) => None,
            ToolError::Malformed(_) => Some("malformed_response".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_error_displays_correctly() {
        let err = Error::Room(RoomError::Api {
            status: 503,
            message: "service unavailable".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("service unavailable"));
    }

    #[test]
    fn fatal_room_errors() {
        assert!(RoomError::ConnectionLost("socket closed".into()).is_fatal());
        assert!(RoomError::AuthenticationFailed("bad token".into()).is_fatal());
        assert!(!RoomError::NotFound("lobby".into()).is_fatal());
        assert!(!RoomError::Transport("dns".into()).is_fatal());
    }

    #[test]
    fn remote_tool_error_keeps_upstream_text() {
        let err = ToolError::Remote {
            status: 429,
            message: "Quota exceeded for quota metric 'Queries'".into(),
        };
        assert_eq!(err.to_string(), "Quota exceeded for quota metric 'Queries'");
        assert_eq!(err.code().as_deref(), Some("429"));
    }

    #[test]
    fn transport_error_has_no_code() {
        let err = ToolError::Transport("error sending request for url".into());
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "error sending request for url");
    }

    #[test]
    fn timeout_code() {
        let err = ToolError::Timeout {
            tool_name: "fetch_page".into(),
            deadline_ms: 1500,
        };
        assert_eq!(err.code().as_deref(), Some("timeout"));
        assert!(err.to_string().contains("1500ms"));
    }
}
