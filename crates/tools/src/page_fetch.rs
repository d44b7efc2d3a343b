//! Page fetch tool: readable text of a web page.
//!
//! Downloads the page, extracts its title with `scraper`, converts the HTML
//! to plain text with `html2text`, and truncates the result on a character
//! boundary.

use async_trait::async_trait;
use roomwarden_config::PageToolConfig;
use roomwarden_core::error::ToolError;
use roomwarden_core::tool::{Tool, ToolKind};
use scraper::{Html, Selector};

use crate::http::{build_client, int_arg, read_body, str_arg, transport};

const MIN_CHARS: usize = 500;
const MAX_CHARS: usize = 12_000;
const TEXT_WIDTH: usize = 100;

pub struct PageFetchTool {
    client: reqwest::Client,
    home_url: Option<String>,
    default_max_chars: usize,
}

impl PageFetchTool {
    pub fn new(config: &PageToolConfig) -> Result<Self, ToolError> {
        Ok(Self {
            client: build_client(&config.user_agent)?,
            home_url: config
                .home_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            default_max_chars: config.max_chars,
        })
    }

    fn resolve_url(&self, arguments: &serde_json::Value) -> Result<url::Url, ToolError> {
        let raw = str_arg(arguments, "url")
            .map(str::to_string)
            .or_else(|| self.home_url.clone())
            .ok_or_else(|| {
                ToolError::InvalidArguments(
                    "Missing 'url' and no home page is configured".into(),
                )
            })?;
        normalize_url(&raw)
    }

    fn max_chars(&self, arguments: &serde_json::Value) -> usize {
        let requested = int_arg(arguments, "max_chars")
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .unwrap_or(self.default_max_chars);
        requested.clamp(MIN_CHARS, MAX_CHARS)
    }
}

/// Add `https://` to scheme-less input and require a host.
pub fn normalize_url(raw: &str) -> Result<url::Url, ToolError> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let parsed = url::Url::parse(&candidate)
        .map_err(|e| ToolError::InvalidArguments(format!("Invalid URL '{raw}': {e}")))?;

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ToolError::InvalidArguments(format!(
            "URL '{raw}' has no host"
        )));
    }
    Ok(parsed)
}

fn extract_title(document: &Html) -> String {
    for selector in ["title", "h1"] {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// Render HTML as wrapped plain text.
fn html_to_text(html: &str, width: usize) -> Result<String, ToolError> {
    html2text::from_read(html.as_bytes(), width)
        .map_err(|e| ToolError::Malformed(format!("could not convert page to text: {e}")))
}

/// Drop trailing spaces and squeeze runs of blank lines to one.
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// Truncate to at most `max_chars` characters, never splitting one.
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (text[..byte_index].to_string(), true),
        None => (text.to_string(), false),
    }
}

#[async_trait]
impl Tool for PageFetchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::FetchPage
    }

    fn description(&self) -> &str {
        "Open a web page and return its title and readable text."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Page address; https:// is added when missing"
                },
                "max_chars": {
                    "type": "integer",
                    "description": "Maximum characters of text to return (500-12000)",
                    "default": self.default_max_chars
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let url = self.resolve_url(&arguments)?;
        let max_chars = self.max_chars(&arguments);

        tracing::debug!(url = %url, max_chars, "Fetching page");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;
        let final_url = response.url().to_string();
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("html"));
        let body = read_body(response).await?;

        let (title, text) = if is_html {
            let document = Html::parse_document(&body);
            let title = extract_title(&document);
            let text = html_to_text(&body, TEXT_WIDTH)?;
            (title, tidy(&text))
        } else {
            (String::new(), tidy(&body))
        };

        let (content, truncated) = truncate_chars(&text, max_chars);

        Ok(serde_json::json!({
            "url": final_url,
            "title": title,
            "content": content,
            "truncated": truncated,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn html_page(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(
            format!("<html><head><title> Example  Page </title></head><body>{body}</body></html>"),
            "text/html; charset=utf-8",
        )
    }

    #[test]
    fn scheme_is_added() {
        let url = normalize_url("example.com/path").unwrap();
        assert_eq!(url.as_str(), "https://example.com/path");
        let url = normalize_url("http://example.com").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn url_without_host_is_rejected() {
        let err = normalize_url("file:///etc/hosts").unwrap_err();
        assert_eq!(err.code().as_deref(), Some("invalid_arguments"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let (text, truncated) = truncate_chars("привіт світ", 6);
        assert_eq!(text, "привіт");
        assert!(truncated);
        let (text, truncated) = truncate_chars("short", 10);
        assert_eq!(text, "short");
        assert!(!truncated);
    }

    #[test]
    fn html_conversion_failure_is_malformed() {
        let text = html_to_text("<p>hello</p>", TEXT_WIDTH).unwrap();
        assert_eq!(text.trim(), "hello");

        // html2text refuses a zero-column layout.
        let err = html_to_text("<p>hello</p>", 0).unwrap_err();
        assert!(matches!(err, ToolError::Malformed(_)));
        assert_eq!(err.code().as_deref(), Some("malformed_response"));
    }

    #[test]
    fn tidy_squeezes_blank_lines() {
        assert_eq!(tidy("a  \n\n\n\nb\n"), "a\n\nb");
    }

    #[test]
    fn max_chars_is_clamped() {
        let tool = PageFetchTool::new(&PageToolConfig::default()).unwrap();
        assert_eq!(tool.max_chars(&json!({})), 2500);
        assert_eq!(tool.max_chars(&json!({ "max_chars": 10 })), MIN_CHARS);
        assert_eq!(tool.max_chars(&json!({ "max_chars": "50000" })), MAX_CHARS);
        assert_eq!(tool.max_chars(&json!({ "max_chars": 0 })), 2500);
    }

    #[tokio::test]
    async fn fetches_title_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(html_page("<h1>Heading</h1><p>Body text here.</p>"))
            .mount(&server)
            .await;

        let tool = PageFetchTool::new(&PageToolConfig::default()).unwrap();
        let out = tool
            .execute(json!({ "url": format!("{}/article", server.uri()) }))
            .await
            .unwrap();

        assert_eq!(out["title"], "Example Page");
        assert!(out["content"].as_str().unwrap().contains("Body text here."));
        assert_eq!(out["truncated"], false);
    }

    #[tokio::test]
    async fn long_pages_are_truncated() {
        let server = MockServer::start().await;
        let paragraph = "<p>".to_string() + &"word ".repeat(400) + "</p>";
        Mock::given(method("GET"))
            .respond_with(html_page(&paragraph))
            .mount(&server)
            .await;

        let tool = PageFetchTool::new(&PageToolConfig::default()).unwrap();
        let out = tool
            .execute(json!({ "url": server.uri(), "max_chars": 500 }))
            .await
            .unwrap();

        assert_eq!(out["truncated"], true);
        assert_eq!(out["content"].as_str().unwrap().chars().count(), 500);
    }

    #[tokio::test]
    async fn home_url_used_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/home"))
            .respond_with(html_page("<p>Welcome</p>"))
            .mount(&server)
            .await;

        let config = PageToolConfig {
            home_url: Some(format!("{}/home", server.uri())),
            ..PageToolConfig::default()
        };
        let tool = PageFetchTool::new(&config).unwrap();
        let out = tool.execute(json!({})).await.unwrap();
        assert!(out["content"].as_str().unwrap().contains("Welcome"));
    }

    #[tokio::test]
    async fn missing_url_without_home_is_invalid() {
        let tool = PageFetchTool::new(&PageToolConfig::default()).unwrap();
        let err = tool.execute(json!({ "url": "" })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn not_found_keeps_upstream_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tool = PageFetchTool::new(&PageToolConfig::default()).unwrap();
        let err = tool
            .execute(json!({ "url": format!("{}/gone", server.uri()) }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not Found");
        assert_eq!(err.code().as_deref(), Some("404"));
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        let tool = PageFetchTool::new(&PageToolConfig::default()).unwrap();
        let err = tool
            .execute(json!({ "url": "http://127.0.0.1:9/unreachable" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Transport(_)));
        assert_eq!(err.code(), None);
    }
}
