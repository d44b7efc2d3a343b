//! Web search tool: Google Programmable Search (Custom Search JSON API).
//!
//! Only registered when search is enabled and both the API key and the
//! engine id are configured. An `error` object in the API response is
//! surfaced exactly as Google worded it, with its status code.

use async_trait::async_trait;
use roomwarden_config::SearchToolConfig;
use roomwarden_core::error::ToolError;
use roomwarden_core::tool::{Tool, ToolKind};
use serde::{Deserialize, Serialize};

use crate::http::{build_client, int_arg, str_arg, transport};

const MIN_LIMIT: i64 = 1;
const MAX_LIMIT: i64 = 10;
const USER_AGENT: &str = concat!("roomwarden/", env!("CARGO_PKG_VERSION"));

pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
    safe: String,
    language: String,
    default_limit: i64,
}

impl WebSearchTool {
    /// Build the tool, or `Disabled` when credentials are missing.
    pub fn new(config: &SearchToolConfig) -> Result<Self, ToolError> {
        let credential = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let (Some(api_key), Some(engine_id)) =
            (credential(&config.api_key), credential(&config.engine_id))
        else {
            return Err(ToolError::Disabled(ToolKind::WebSearch.to_string()));
        };

        Ok(Self {
            client: build_client(USER_AGENT)?,
            endpoint: config.endpoint.clone(),
            api_key,
            engine_id,
            safe: config.safe.clone(),
            language: config.language.clone(),
            default_limit: i64::from(config.default_limit),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WebSearch
    }

    fn description(&self) -> &str {
        "Search the web. Returns the top results with titles, links, and snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "limit": {
                    "type": "integer",
                    "description": "Number of results to return (1-10)",
                    "default": self.default_limit
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let query = str_arg(&arguments, "query")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let limit = int_arg(&arguments, "limit")
            .unwrap_or(self.default_limit)
            .clamp(MIN_LIMIT, MAX_LIMIT);

        tracing::debug!(query, limit, "Searching the web");

        let num = limit.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
                ("safe", self.safe.as_str()),
                ("hl", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        let parsed: Result<SearchResponse, _> = serde_json::from_str(&body);

        match parsed {
            Ok(SearchResponse {
                error: Some(error), ..
            }) => Err(ToolError::Remote {
                status: error.code.unwrap_or(status.as_u16()),
                message: error.message,
            }),
            Ok(_) | Err(_) if !status.is_success() => {
                let trimmed = body.trim();
                Err(ToolError::Remote {
                    status: status.as_u16(),
                    message: if trimmed.is_empty() {
                        status.canonical_reason().unwrap_or_default().to_string()
                    } else {
                        trimmed.to_string()
                    },
                })
            }
            Ok(results) => {
                let items: Vec<SearchItem> =
                    results.items.into_iter().take(limit as usize).collect();
                serde_json::to_value(items).map_err(|e| ToolError::Malformed(e.to_string()))
            }
            Err(e) => Err(ToolError::Malformed(format!(
                "search response is not valid JSON: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> SearchToolConfig {
        SearchToolConfig {
            enabled: true,
            api_key: Some("test-key".into()),
            engine_id: Some("engine-1".into()),
            endpoint: endpoint.into(),
            ..SearchToolConfig::default()
        }
    }

    #[test]
    fn missing_credentials_disable_the_tool() {
        let mut cfg = config("http://localhost");
        cfg.engine_id = Some("   ".into());
        let err = WebSearchTool::new(&cfg).err().unwrap();
        assert_eq!(err.code().as_deref(), Some("tool_disabled"));
    }

    #[tokio::test]
    async fn returns_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("q", "rust async"))
            .and(query_param("num", "2"))
            .and(query_param("cx", "engine-1"))
            .and(query_param("hl", "uk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "title": "Tokio", "link": "https://tokio.rs", "snippet": "Runtime" },
                    { "title": "Async Book", "link": "https://rust-lang.github.io/async-book/", "snippet": "Guide" },
                    { "title": "Extra", "link": "https://example.com", "snippet": "Dropped" }
                ]
            })))
            .mount(&server)
            .await;

        let endpoint = format!("{}/customsearch/v1", server.uri());
        let tool = WebSearchTool::new(&config(&endpoint)).unwrap();
        let out = tool
            .execute(json!({ "query": "rust async", "limit": 2 }))
            .await
            .unwrap();

        let results = out.as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["link"], "https://tokio.rs");
    }

    #[tokio::test]
    async fn no_items_is_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "kind": "customsearch#search" })),
            )
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(&config(&server.uri())).unwrap();
        let out = tool.execute(json!({ "query": "nothing" })).await.unwrap();
        assert_eq!(out, json!([]));
    }

    #[tokio::test]
    async fn api_error_is_surfaced_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "code": 429,
                    "message": "Quota exceeded for quota metric 'Queries' and limit 'Queries per day'",
                    "status": "RESOURCE_EXHAUSTED"
                }
            })))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(&config(&server.uri())).unwrap();
        let err = tool.execute(json!({ "query": "anything" })).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Quota exceeded for quota metric 'Queries' and limit 'Queries per day'"
        );
        assert_eq!(err.code().as_deref(), Some("429"));
    }

    #[tokio::test]
    async fn non_json_failure_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream connect error"))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(&config(&server.uri())).unwrap();
        let err = tool.execute(json!({ "query": "anything" })).await.unwrap_err();
        assert_eq!(err.to_string(), "upstream connect error");
        assert_eq!(err.code().as_deref(), Some("502"));
    }

    #[tokio::test]
    async fn empty_query_is_invalid() {
        let tool = WebSearchTool::new(&config("http://localhost")).unwrap();
        let err = tool.execute(json!({ "query": "  " })).await.unwrap_err();
        assert_eq!(err.code().as_deref(), Some("invalid_arguments"));
    }
}
