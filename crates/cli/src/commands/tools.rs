//! `roomwarden tools`: what the model is offered.

use std::sync::Arc;

use roomwarden_config::AppConfig;
use roomwarden_tools::{ToolDispatcher, default_registry};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = default_registry(&config.tools)?;
    let dispatcher = ToolDispatcher::from_config(Arc::new(registry), &config.tools);

    println!("{}", serde_json::to_string_pretty(&dispatcher.definitions())?);
    Ok(())
}
