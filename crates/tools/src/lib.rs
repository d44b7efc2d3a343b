//! Built-in tool capabilities for RoomWarden.
//!
//! Tools give the model a narrow window onto the outside world:
//! the local time, news feeds, web pages, and (when configured) web
//! search. The [`ToolDispatcher`] runs them under per-tool deadlines and
//! relays their failures without rewording.

pub mod dispatcher;
pub mod feed_fetch;
mod http;
pub mod page_fetch;
pub mod time_lookup;
pub mod web_search;

use roomwarden_config::ToolsConfig;
use roomwarden_core::error::ToolError;
use roomwarden_core::tool::ToolRegistry;
use std::sync::Arc;

pub use dispatcher::ToolDispatcher;

/// Create a registry with every capability the configuration enables.
///
/// Web search is only registered when it is switched on and both its API
/// key and engine id are present; otherwise calls to it report
/// `tool_disabled`.
pub fn default_registry(config: &ToolsConfig) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(time_lookup::TimeLookupTool::new(&config.time)));
    registry.register(Arc::new(feed_fetch::FeedFetchTool::new(&config.feeds)?));
    registry.register(Arc::new(page_fetch::PageFetchTool::new(&config.page)?));

    if config.search.enabled {
        match web_search::WebSearchTool::new(&config.search) {
            Ok(tool) => registry.register(Arc::new(tool)),
            Err(e) => tracing::warn!(error = %e, "Web search enabled but not configured"),
        }
    }

    Ok(registry)
}
