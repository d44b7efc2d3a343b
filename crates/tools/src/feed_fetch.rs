//! Feed fetch tool: latest entries from an RSS 2.0 or Atom feed.
//!
//! The model names a feed either by full URL or by an id, title, or alias
//! from the configured catalog. Entries come back as structured items with
//! HTML stripped from their summaries.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use roomwarden_config::{FeedEntry, FeedToolConfig};
use roomwarden_core::error::ToolError;
use roomwarden_core::tool::{Tool, ToolKind};
use scraper::Html;
use serde::Serialize;

use crate::http::{build_client, int_arg, read_body, str_arg, transport};

const MIN_LIMIT: i64 = 1;
const MAX_LIMIT: i64 = 10;

pub struct FeedFetchTool {
    client: reqwest::Client,
    catalog: Vec<FeedEntry>,
    default_limit: i64,
    description: String,
}

impl FeedFetchTool {
    pub fn new(config: &FeedToolConfig) -> Result<Self, ToolError> {
        Ok(Self {
            client: build_client(&config.user_agent)?,
            catalog: config.catalog.clone(),
            default_limit: i64::from(config.default_limit),
            description: describe_catalog(&config.catalog),
        })
    }

    /// Find a catalog entry by id, title, or alias.
    fn lookup(&self, name: &str) -> Option<&FeedEntry> {
        let wanted = normalize(name);
        self.catalog.iter().find(|entry| {
            std::iter::once(&entry.id)
                .chain(std::iter::once(&entry.title))
                .chain(entry.aliases.iter())
                .any(|candidate| !candidate.trim().is_empty() && normalize(candidate) == wanted)
        })
    }

    fn catalog_listing(&self) -> String {
        self.catalog
            .iter()
            .map(|entry| format!("{} ({})", entry.id, entry.title))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn describe_catalog(catalog: &[FeedEntry]) -> String {
    let mut text = String::from(
        "Read the latest entries of a news feed. Pass feed_url as a full http(s) URL \
         or as one of these catalog ids:",
    );
    for entry in catalog {
        text.push_str(&format!("\n- {} (`{}`)", entry.title, entry.id));
        if !entry.description.is_empty() {
            text.push_str(&format!(": {}", entry.description));
        }
    }
    text
}

/// Case-insensitive comparison key with runs of whitespace collapsed.
fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedItem {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub published: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub link: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
}

#[derive(Debug, Default)]
struct ItemBuilder {
    title: String,
    published: String,
    link: String,
    summary: String,
    content: String,
}

impl ItemBuilder {
    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Published => &mut self.published,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
        }
    }

    fn finish(self) -> FeedItem {
        let summary = if self.summary.trim().is_empty() {
            self.content
        } else {
            self.summary
        };
        let title = collapse(&self.title);
        FeedItem {
            title: if title.is_empty() { "Untitled".into() } else { title },
            published: self.published.trim().to_string(),
            link: self.link.trim().to_string(),
            summary: strip_html(&summary),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Published,
    Link,
    Summary,
    Content,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"title" => Some(Field::Title),
            b"pubDate" | b"published" | b"updated" | b"date" => Some(Field::Published),
            b"link" => Some(Field::Link),
            b"description" | b"summary" => Some(Field::Summary),
            b"encoded" | b"content" => Some(Field::Content),
            _ => None,
        }
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_html(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    let text: String = parsed.root_element().text().collect();
    collapse(&text)
}

/// `href` of an Atom `<link>` that points at the entry itself.
fn atom_href(element: &BytesStart<'_>) -> Option<String> {
    let rel = element
        .try_get_attribute("rel")
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
    if rel.as_deref().is_some_and(|r| r != "alternate") {
        return None;
    }
    element
        .try_get_attribute("href")
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse up to `limit` entries from an RSS 2.0, RSS 1.0, or Atom document.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<FeedItem>, ToolError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut saw_feed_root = false;
    let mut items = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    let mut field: Option<(Field, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ToolError::Malformed(format!("feed is not valid XML: {e}")))?;

        match event {
            Event::Start(element) => {
                let name = element.local_name();
                match name.as_ref() {
                    b"rss" | b"feed" | b"RDF" => saw_feed_root = true,
                    b"item" | b"entry" => current = Some(ItemBuilder::default()),
                    tag => {
                        if let (Some(item), Some(kind)) = (current.as_mut(), Field::from_tag(tag)) {
                            if field.is_none() {
                                field = Some((kind, String::new()));
                            }
                            if kind == Field::Link && item.link.is_empty() {
                                if let Some(href) = atom_href(&element) {
                                    item.link = href;
                                }
                            }
                        }
                    }
                }
            }
            Event::Empty(element) => {
                if let Some(item) = current.as_mut() {
                    if element.local_name().as_ref() == b"link" && item.link.is_empty() {
                        if let Some(href) = atom_href(&element) {
                            item.link = href;
                        }
                    }
                }
            }
            Event::Text(text) => {
                if let Some((_, buffer)) = field.as_mut() {
                    let value = text
                        .unescape()
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    buffer.push_str(&value);
                }
            }
            Event::CData(data) => {
                if let Some((_, buffer)) = field.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(element) => {
                let name = element.local_name();
                let tag = name.as_ref();
                if tag == b"item" || tag == b"entry" {
                    field = None;
                    if let Some(item) = current.take() {
                        items.push(item.finish());
                        if items.len() >= limit {
                            break;
                        }
                    }
                } else if let Some(item) = current.as_mut() {
                    let closes_field =
                        matches!(field, Some((kind, _)) if Field::from_tag(tag) == Some(kind));
                    if closes_field {
                        if let Some((kind, value)) = field.take() {
                            let slot = item.slot(kind);
                            if slot.trim().is_empty() {
                                *slot = value;
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_feed_root {
        return Err(ToolError::Malformed(
            "response is not an RSS or Atom feed".into(),
        ));
    }

    Ok(items)
}

#[async_trait]
impl Tool for FeedFetchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::FetchFeed
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "feed_url": {
                    "type": "string",
                    "description": "Full feed URL, or a catalog id, title, or alias"
                },
                "limit": {
                    "type": "integer",
                    "description": "How many entries to return (1-10)",
                    "default": self.default_limit
                }
            },
            "required": ["feed_url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let requested = str_arg(&arguments, "feed_url").ok_or_else(|| {
            ToolError::InvalidArguments(format!(
                "Missing 'feed_url'. Pass a full feed URL or one of: {}",
                self.catalog_listing()
            ))
        })?;

        let lowered = requested.to_lowercase();
        let (url, feed) = if lowered.starts_with("http://") || lowered.starts_with("https://") {
            (requested.to_string(), serde_json::json!({ "url": requested }))
        } else {
            let entry = self.lookup(requested).ok_or_else(|| {
                ToolError::InvalidArguments(format!(
                    "Unknown feed '{requested}'. Available feeds: {}",
                    self.catalog_listing()
                ))
            })?;
            (
                entry.url.clone(),
                serde_json::json!({ "id": entry.id, "title": entry.title, "url": entry.url }),
            )
        };

        let limit = int_arg(&arguments, "limit")
            .unwrap_or(self.default_limit)
            .clamp(MIN_LIMIT, MAX_LIMIT) as usize;

        tracing::debug!(url = %url, limit, "Fetching feed");

        let response = self
            .client
            .get(&url)
            .header(
                reqwest::header::ACCEPT,
                "application/rss+xml, application/atom+xml, application/xml;q=0.9, */*;q=0.8",
            )
            .send()
            .await
            .map_err(transport)?;
        let body = read_body(response).await?;

        let items = parse_feed(&body, limit)?;

        Ok(serde_json::json!({
            "feed": feed,
            "items": items,
        }))
    }
}
