//! `roomwarden invoke`: run one tool call outside a session.
//!
//! Prints the reply JSON on stdout. The exit code is 1 when the reply is an
//! error, including a timeout.

use std::process::ExitCode;
use std::sync::Arc;

use roomwarden_config::{AppConfig, ToolsConfig};
use roomwarden_core::tool::{ToolCall, ToolErrorDescriptor, ToolKind, ToolOutcome, ToolReply};
use roomwarden_tools::{ToolDispatcher, default_registry};
use tracing::{debug, warn};

pub async fn run(
    name: String,
    args: String,
    id: Option<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let reply = invoke(&config.tools, name, &args, id).await?;

    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(if reply.outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Build the dispatcher from `config` and run one call.
pub async fn invoke(
    config: &ToolsConfig,
    name: String,
    args: &str,
    id: Option<String>,
) -> Result<ToolReply, Box<dyn std::error::Error>> {
    let arguments = parse_args(args)?;
    let call = ToolCall {
        id: id.unwrap_or_else(|| "cli".to_string()),
        name,
        arguments,
    };

    if let Ok(kind) = call.name.parse::<ToolKind>()
        && kind.is_session_control()
    {
        warn!(tool = %kind, "Video toggles only act inside a running session");
        return Ok(ToolReply {
            call_id: call.id,
            tool: call.name,
            outcome: ToolOutcome::Error {
                error: ToolErrorDescriptor {
                    message: format!("{kind} only acts on a running session's video"),
                    code: Some("session_control".into()),
                },
            },
        });
    }

    debug!(call_id = %call.id, tool = %call.name, "Invoking tool outside a session");
    let registry = default_registry(config)?;
    let dispatcher = ToolDispatcher::from_config(Arc::new(registry), config);
    Ok(dispatcher.dispatch(call).await)
}

fn parse_args(raw: &str) -> Result<serde_json::Value, String> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| format!("--args is not valid JSON: {e}"))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err("--args must be a JSON object".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_must_be_an_object() {
        assert!(parse_args(r#"{"limit": 3}"#).is_ok());
        assert!(parse_args("[1, 2]").is_err());
        assert!(parse_args("{limit: 3").is_err());
    }

    #[tokio::test]
    async fn current_time_runs_offline() {
        let reply = invoke(&ToolsConfig::default(), "current_time".into(), "{}", Some("t-1".into()))
            .await
            .unwrap();
        assert_eq!(reply.call_id, "t-1");
        let payload = match &reply.outcome {
            ToolOutcome::Success { payload } => payload,
            other => panic!("expected success, got {other:?}"),
        };
        assert_eq!(payload["timezone"], "Europe/Kyiv");
    }

    #[tokio::test]
    async fn unknown_and_disabled_tools_are_distinct() {
        let config = ToolsConfig::default();

        let unknown = invoke(&config, "order_pizza".into(), "{}", None).await.unwrap();
        assert_eq!(unknown.outcome.error().unwrap().code.as_deref(), Some("unknown_tool"));

        let disabled = invoke(&config, "web_search".into(), r#"{"query": "rust"}"#, None)
            .await
            .unwrap();
        assert_eq!(disabled.outcome.error().unwrap().code.as_deref(), Some("tool_disabled"));
    }

    #[tokio::test]
    async fn video_toggles_need_a_session() {
        let reply = invoke(&ToolsConfig::default(), "disable_video".into(), "{}", None)
            .await
            .unwrap();
        assert_eq!(
            reply.outcome.error().unwrap().code.as_deref(),
            Some("session_control")
        );
    }
}
