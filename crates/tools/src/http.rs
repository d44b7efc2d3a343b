//! Shared HTTP plumbing for the network-backed capabilities.
//!
//! Failures keep the upstream wording: a non-success status becomes
//! `ToolError::Remote` carrying the response body (or the canonical reason
//! when the body is empty), and a reqwest failure becomes
//! `ToolError::Transport` carrying reqwest's own message.

use roomwarden_core::error::ToolError;

pub(crate) fn build_client(user_agent: &str) -> Result<reqwest::Client, ToolError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(transport)
}

pub(crate) fn transport(err: reqwest::Error) -> ToolError {
    ToolError::Transport(err.to_string())
}

/// Read the body of a response, turning non-success statuses into `Remote`.
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String, ToolError> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    if status.is_success() {
        return Ok(body);
    }

    let trimmed = body.trim();
    let message = if trimmed.is_empty() {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    } else {
        trimmed.to_string()
    };

    Err(ToolError::Remote {
        status: status.as_u16(),
        message,
    })
}

/// Read an integer argument that may arrive as a number or a numeric string.
pub(crate) fn int_arg(arguments: &serde_json::Value, key: &str) -> Option<i64> {
    match arguments.get(key)? {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a non-blank string argument.
pub(crate) fn str_arg<'a>(arguments: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_arg_accepts_numbers_and_strings() {
        let args = json!({ "a": 4, "b": "7", "c": "many", "d": 2.9 });
        assert_eq!(int_arg(&args, "a"), Some(4));
        assert_eq!(int_arg(&args, "b"), Some(7));
        assert_eq!(int_arg(&args, "c"), None);
        assert_eq!(int_arg(&args, "d"), Some(2));
        assert_eq!(int_arg(&args, "missing"), None);
    }

    #[test]
    fn str_arg_skips_blank_values() {
        let args = json!({ "url": "  ", "q": " rust " });
        assert_eq!(str_arg(&args, "url"), None);
        assert_eq!(str_arg(&args, "q"), Some("rust"));
    }
}
