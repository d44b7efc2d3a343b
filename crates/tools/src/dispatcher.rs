//! Tool dispatcher: runs one invocation against the registry under a deadline.
//!
//! The dispatcher never rewords a failure: whatever the capability returned
//! becomes the reply's error descriptor, and the only errors it produces
//! itself are `unknown_tool`, `tool_disabled` and `timeout`. When the
//! deadline elapses the capability's future is dropped, so no late result
//! can follow the timeout reply.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use roomwarden_config::ToolsConfig;
use roomwarden_core::error::ToolError;
use roomwarden_core::tool::{
    ToolCall, ToolDefinition, ToolInvocation, ToolKind, ToolOutcome, ToolRegistry, ToolReply,
};
use tracing::{info, warn};

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    default_deadline: Duration,
    deadlines: HashMap<ToolKind, Duration>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, default_deadline: Duration) -> Self {
        Self {
            registry,
            default_deadline,
            deadlines: HashMap::new(),
        }
    }

    /// Dispatcher with the per-tool deadlines from configuration.
    pub fn from_config(registry: Arc<ToolRegistry>, config: &ToolsConfig) -> Self {
        Self::new(registry, config.deadline(None))
            .with_deadline(ToolKind::CurrentTime, config.deadline(config.time.deadline_secs))
            .with_deadline(ToolKind::FetchFeed, config.deadline(config.feeds.deadline_secs))
            .with_deadline(ToolKind::FetchPage, config.deadline(config.page.deadline_secs))
            .with_deadline(ToolKind::WebSearch, config.deadline(config.search.deadline_secs))
    }

    pub fn with_deadline(mut self, kind: ToolKind, deadline: Duration) -> Self {
        self.deadlines.insert(kind, deadline);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn deadline_for(&self, name: &str) -> Duration {
        name.parse::<ToolKind>()
            .ok()
            .and_then(|kind| self.deadlines.get(&kind).copied())
            .unwrap_or(self.default_deadline)
    }

    /// Everything the model may call: registered capabilities plus the
    /// session-control kinds.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions = self.registry.definitions();
        definitions.extend(
            ToolKind::ALL
                .iter()
                .filter_map(|kind| kind.session_control_definition()),
        );
        definitions
    }

    /// Bind an inbound call to its deadline.
    pub fn prepare(&self, call: ToolCall) -> ToolInvocation {
        ToolInvocation {
            deadline: self.deadline_for(&call.name),
            id: call.id,
            name: call.name,
            arguments: call.arguments,
        }
    }

    /// Prepare and invoke in one step.
    pub async fn dispatch(&self, call: ToolCall) -> ToolReply {
        let invocation = self.prepare(call);
        self.invoke(invocation).await
    }

    /// Run one invocation. Always yields exactly one reply.
    pub async fn invoke(&self, invocation: ToolInvocation) -> ToolReply {
        let ToolInvocation {
            id,
            name,
            arguments,
            deadline,
        } = invocation;
        let started = Instant::now();

        let result = match self.registry.resolve(&name) {
            Ok(tool) => match tokio::time::timeout(deadline, tool.execute(arguments)).await {
                Ok(result) => result,
                Err(_) => Err(ToolError::Timeout {
                    tool_name: name.clone(),
                    deadline_ms: deadline.as_millis() as u64,
                }),
            },
            Err(e) => Err(e),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(call_id = %id, tool = %name, duration_ms, "Tool call completed"),
            Err(e) => {
                let code = e.code().unwrap_or_default();
                warn!(
                    call_id = %id,
                    tool = %name,
                    duration_ms,
                    code = %code,
                    error = %e,
                    "Tool call failed"
                );
            }
        }

        ToolReply {
            call_id: id,
            tool: name,
            outcome: ToolOutcome::from(result),
        }
    }
}
