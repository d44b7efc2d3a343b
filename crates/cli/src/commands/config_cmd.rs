//! `roomwarden config`: configuration inspection.

use roomwarden_config::AppConfig;

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&redacted(&config))?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed successfully");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Room:        {}", display_or_unset(&config.room.name));
    println!("   Identity:    {}", config.room.agent_identity);
    println!(
        "   Occupancy:   {}",
        if config.occupancy.enabled { "guarded" } else { "join immediately" }
    );
    println!("   Shutdown:    {}s after the room empties", config.lifecycle.shutdown_delay_secs);
    println!(
        "   Video:       {} fps speaking, {} fps silent",
        config.video.fps_speaking, config.video.fps_silent
    );
    println!("   Feeds:       {}", config.tools.feeds.catalog.len());
    println!(
        "   Web search:  {}",
        if config.tools.search.enabled { "enabled" } else { "disabled" }
    );

    Ok(())
}

/// A copy safe to print.
pub fn redacted(config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    if config.tools.search.api_key.is_some() {
        config.tools.search.api_key = Some("[REDACTED]".into());
    }
    config
}

fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if config.room.name.trim().is_empty() {
        warnings.push("room.name is not set (set ROOMWARDEN_ROOM)");
    }
    let search = &config.tools.search;
    if search.enabled && (search.api_key.is_none() || search.engine_id.is_none()) {
        warnings.push("web_search is enabled but API key or engine id is missing");
    }
    if !config.lifecycle.terminate_on_empty {
        warnings.push("terminate_on_empty is off: sessions stay up in an empty room");
    }
    warnings
}

fn display_or_unset(value: &str) -> &str {
    if value.trim().is_empty() { "(unset)" } else { value }
}
