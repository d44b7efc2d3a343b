//! Tool trait: the abstraction over capabilities the model may call.
//!
//! The set of tools is closed: every capability is named by a [`ToolKind`].
//! Capability implementations live in `roomwarden-tools`; the session
//! controller handles the session-control kinds itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ToolError;

/// Every tool name the model can be offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    CurrentTime,
    FetchFeed,
    FetchPage,
    WebSearch,
    DisableVideo,
    EnableVideo,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::CurrentTime,
        ToolKind::FetchFeed,
        ToolKind::FetchPage,
        ToolKind::WebSearch,
        ToolKind::DisableVideo,
        ToolKind::EnableVideo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::CurrentTime => "current_time",
            ToolKind::FetchFeed => "fetch_feed",
            ToolKind::FetchPage => "fetch_page",
            ToolKind::WebSearch => "web_search",
            ToolKind::DisableVideo => "disable_video",
            ToolKind::EnableVideo => "enable_video",
        }
    }

    /// Kinds handled by the session controller instead of a capability.
    pub fn is_session_control(&self) -> bool {
        matches!(self, ToolKind::DisableVideo | ToolKind::EnableVideo)
    }

    /// Definition for a session-control kind (they take no arguments).
    pub fn session_control_definition(&self) -> Option<ToolDefinition> {
        let description = match self {
            ToolKind::DisableVideo => "Stop forwarding the participant's video to the model.",
            ToolKind::EnableVideo => "Resume forwarding the participant's video to the model.",
            _ => return None,
        };
        Some(ToolDefinition {
            name: self.as_str().to_string(),
            description: description.to_string(),
            parameters: serde_json::json!({ "type": "object", "properties": {} }),
        })
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ToolError::NotFound(s.to_string()))
    }
}

/// A tool as advertised to the model collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: serde_json::Value,
}

/// An inbound tool-call request from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Invocation identifier, echoed back on the reply
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// A tool call bound to its deadline, as executed by the dispatcher.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
    pub deadline: Duration,
}

/// The error half of a tool reply: the failure text exactly as produced,
/// plus a machine-readable code when one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolErrorDescriptor {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&ToolError> for ToolErrorDescriptor {
    fn from(err: &ToolError) -> Self {
        Self {
            message: err.to_string(),
            code: err.code(),
        }
    }
}

impl From<ToolError> for ToolErrorDescriptor {
    fn from(err: ToolError) -> Self {
        Self::from(&err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { payload: serde_json::Value },
    Error { error: ToolErrorDescriptor },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&ToolErrorDescriptor> {
        match self {
            ToolOutcome::Error { error } => Some(error),
            ToolOutcome::Success { .. } => None,
        }
    }
}

impl From<Result<serde_json::Value, ToolError>> for ToolOutcome {
    fn from(result: Result<serde_json::Value, ToolError>) -> Self {
        match result {
            Ok(payload) => ToolOutcome::Success { payload },
            Err(err) => ToolOutcome::Error { error: err.into() },
        }
    }
}

/// The result of one invocation, paired with its request by `call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolReply {
    pub call_id: String,
    pub tool: String,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

/// The capability interface every built-in tool implements.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which closed-set name this capability answers to.
    fn kind(&self) -> ToolKind;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.kind().as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The enabled capabilities, keyed by kind.
pub struct ToolRegistry {
    tools: BTreeMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool of the same kind.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    pub fn get(&self, kind: ToolKind) -> Option<&Arc<dyn Tool>> {
        self.tools.get(&kind)
    }

    /// Resolve a requested name to an enabled capability.
    ///
    /// Names outside the closed set are `NotFound`; known capabilities that
    /// were not registered are `Disabled`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        let kind: ToolKind = name.parse()?;
        self.tools
            .get(&kind)
            .cloned()
            .ok_or_else(|| ToolError::Disabled(name.to_string()))
    }

    /// Definitions of every registered capability.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    pub fn kinds(&self) -> Vec<ToolKind> {
        self.tools.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct ClockTool;

    #[async_trait]
    impl Tool for ClockTool {
        fn kind(&self) -> ToolKind {
            ToolKind::CurrentTime
        }
        fn description(&self) -> &str {
            "Returns a fixed time"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object", "properties": {} })
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(serde_json::json!({ "iso8601": "2026-01-01T00:00:00Z" }))
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.as_str().parse::<ToolKind>().unwrap(), kind);
        }
        assert!(matches!(
            "launch_rocket".parse::<ToolKind>(),
            Err(ToolError::NotFound(_))
        ));
    }

    #[test]
    fn session_control_kinds() {
        assert!(ToolKind::DisableVideo.is_session_control());
        assert!(!ToolKind::FetchPage.is_session_control());
        assert!(ToolKind::EnableVideo.session_control_definition().is_some());
        assert!(ToolKind::WebSearch.session_control_definition().is_none());
    }

    #[test]
    fn registry_resolves_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ClockTool));
        assert!(registry.resolve("current_time").is_ok());
        assert_eq!(registry.definitions()[0].name, "current_time");
    }

    #[test]
    fn registry_distinguishes_unknown_from_disabled() {
        let registry = ToolRegistry::new();
        assert!(matches!(
            registry.resolve("web_search"),
            Err(ToolError::Disabled(_))
        ));
        assert!(matches!(
            registry.resolve("no_such_tool"),
            Err(ToolError::NotFound(_))
        ));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let reply = ToolReply {
            call_id: "call_1".into(),
            tool: "fetch_page".into(),
            outcome: ToolOutcome::from(Err::<serde_json::Value, _>(ToolError::Remote {
                status: 404,
                message: "Not Found".into(),
            })),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["message"], "Not Found");
        assert_eq!(json["error"]["code"], "404");
        assert_eq!(json["call_id"], "call_1");
    }
}
