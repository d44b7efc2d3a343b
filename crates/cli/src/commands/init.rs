//! `roomwarden init`: write the default configuration.

use std::path::Path;

use roomwarden_config::AppConfig;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");

    if write_default(&config_path, force)? {
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set room.name in {}", config_path.display());
        println!("   2. Export GOOGLE_SEARCH_API_KEY and GOOGLE_SEARCH_ENGINE_ID to enable web_search");
        println!("   3. Run: roomwarden tools\n");
    } else {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.");
    }

    Ok(())
}

/// Returns `false` when the file exists and `force` is not set.
pub fn write_default(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_loadable_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(write_default(&path, false).unwrap());
        let config = AppConfig::load_from(&path).unwrap();
        assert!(config.validate().is_ok());

        std::fs::write(&path, "[room]\nname = \"standup\"\n").unwrap();
        assert!(!write_default(&path, false).unwrap());
        assert!(std::fs::read_to_string(&path).unwrap().contains("standup"));

        assert!(write_default(&path, true).unwrap());
        assert!(!std::fs::read_to_string(&path).unwrap().contains("standup"));
    }
}
