//! Configuration loading, validation, and management for RoomWarden.
//!
//! Loads configuration from `~/.roomwarden/config.toml` with environment
//! variable overrides. Validates all settings at startup. Every behaviour
//! toggle the session controller honours lives in [`AppConfig`]; nothing
//! downstream reads the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.roomwarden/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which room to attach to and who the agent is
    #[serde(default)]
    pub room: RoomConfig,

    /// Wait-for-occupant guard
    #[serde(default)]
    pub occupancy: OccupancyConfig,

    /// Greeting and empty-room shutdown
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Voice-activity-adaptive video sampling
    #[serde(default)]
    pub video: VideoConfig,

    /// Tool deadlines and per-tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_true() -> bool {
    true
}

/// Longest delay, timeout or deadline the configuration accepts (one week).
pub const MAX_DURATION_SECS: f64 = 7.0 * 24.0 * 3600.0;

/// Seconds to a `Duration`, saturating instead of panicking on values
/// `validate` would reject.
fn secs(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    #[serde(default)]
    pub name: String,

    /// Identity the agent joins with; never counted as an occupant
    #[serde(default = "default_agent_identity")]
    pub agent_identity: String,
}

fn default_agent_identity() -> String {
    "roomwarden".into()
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            agent_identity: default_agent_identity(),
        }
    }
}

/// What to do when the occupancy wait times out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyTimeoutPolicy {
    /// Join the empty room anyway
    #[default]
    Join,
    /// Give up without joining
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupancyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: f64,

    /// 0 waits forever
    #[serde(default)]
    pub wait_timeout_secs: f64,

    #[serde(default)]
    pub on_timeout: OccupancyTimeoutPolicy,
}

fn default_poll_interval() -> f64 {
    2.0
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval(),
            wait_timeout_secs: 0.0,
            on_timeout: OccupancyTimeoutPolicy::default(),
        }
    }
}

impl OccupancyConfig {
    pub fn poll_interval(&self) -> Duration {
        secs(self.poll_interval_secs)
    }

    /// `None` when the wait is unbounded.
    pub fn wait_timeout(&self) -> Option<Duration> {
        (self.wait_timeout_secs > 0.0).then(|| secs(self.wait_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_greeting_delay")]
    pub greeting_delay_secs: f64,

    #[serde(default = "default_greeting_attempts")]
    pub greeting_attempts: u32,

    /// Multiplied by the attempt number between greeting retries
    #[serde(default = "default_greeting_backoff")]
    pub greeting_backoff_secs: f64,

    #[serde(default = "default_true")]
    pub terminate_on_empty: bool,

    #[serde(default = "default_true")]
    pub close_room_on_empty: bool,

    #[serde(default = "default_shutdown_delay")]
    pub shutdown_delay_secs: f64,

    /// How often the participant list is re-read to catch missed
    /// join/leave notifications; 0 disables
    #[serde(default = "default_presence_resync")]
    pub presence_resync_secs: f64,
}

fn default_greeting_delay() -> f64 {
    0.5
}
fn default_greeting_attempts() -> u32 {
    3
}
fn default_greeting_backoff() -> f64 {
    0.6
}
fn default_shutdown_delay() -> f64 {
    3.0
}
fn default_presence_resync() -> f64 {
    5.0
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            greeting_delay_secs: default_greeting_delay(),
            greeting_attempts: default_greeting_attempts(),
            greeting_backoff_secs: default_greeting_backoff(),
            terminate_on_empty: true,
            close_room_on_empty: true,
            shutdown_delay_secs: default_shutdown_delay(),
            presence_resync_secs: default_presence_resync(),
        }
    }
}

impl LifecycleConfig {
    pub fn greeting_delay(&self) -> Duration {
        secs(self.greeting_delay_secs)
    }

    pub fn greeting_backoff(&self) -> Duration {
        secs(self.greeting_backoff_secs)
    }

    pub fn shutdown_delay(&self) -> Duration {
        secs(self.shutdown_delay_secs)
    }

    /// `None` when resync is disabled.
    pub fn presence_resync(&self) -> Option<Duration> {
        (self.presence_resync_secs > 0.0).then(|| secs(self.presence_resync_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_fps_speaking")]
    pub fps_speaking: f64,

    #[serde(default = "default_fps_silent")]
    pub fps_silent: f64,

    /// Whether video is forwarded when the session starts
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_fps_speaking() -> f64 {
    1.0
}
fn default_fps_silent() -> f64 {
    0.3
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps_speaking: default_fps_speaking(),
            fps_silent: default_fps_silent(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Deadline for any tool without its own
    #[serde(default = "default_deadline")]
    pub default_deadline_secs: f64,

    #[serde(default)]
    pub time: TimeToolConfig,

    #[serde(default)]
    pub feeds: FeedToolConfig,

    #[serde(default)]
    pub page: PageToolConfig,

    #[serde(default)]
    pub search: SearchToolConfig,
}

fn default_deadline() -> f64 {
    15.0
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            default_deadline_secs: default_deadline(),
            time: TimeToolConfig::default(),
            feeds: FeedToolConfig::default(),
            page: PageToolConfig::default(),
            search: SearchToolConfig::default(),
        }
    }
}

impl ToolsConfig {
    /// Resolve a per-tool override against the default deadline.
    pub fn deadline(&self, per_tool: Option<f64>) -> Duration {
        secs(per_tool.unwrap_or(self.default_deadline_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeToolConfig {
    /// IANA zone name
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Used when `timezone` is not a known zone
    #[serde(default = "default_offset_hours")]
    pub fallback_offset_hours: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<f64>,
}

fn default_timezone() -> String {
    "Europe/Kyiv".into()
}
fn default_offset_hours() -> i32 {
    3
}

impl Default for TimeToolConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            fallback_offset_hours: default_offset_hours(),
            deadline_secs: None,
        }
    }
}

/// One named feed the model can ask for by id, title or alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub url: String,

    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedToolConfig {
    #[serde(default = "default_feed_limit")]
    pub default_limit: u32,

    #[serde(default = "default_feed_user_agent")]
    pub user_agent: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<f64>,

    #[serde(default = "default_catalog")]
    pub catalog: Vec<FeedEntry>,
}

fn default_feed_limit() -> u32 {
    3
}
fn default_feed_user_agent() -> String {
    "RoomWardenFeeds/0.1 (+https://github.com/roomwarden/roomwarden)".into()
}
fn default_catalog() -> Vec<FeedEntry> {
    vec![FeedEntry {
        id: "headlines".into(),
        title: "Headlines".into(),
        description: "All breaking stories.".into(),
        url: "https://24tv.ua/rss/all.xml".into(),
        aliases: vec!["news".into(), "новини".into()],
    }]
}

impl Default for FeedToolConfig {
    fn default() -> Self {
        Self {
            default_limit: default_feed_limit(),
            user_agent: default_feed_user_agent(),
            deadline_secs: None,
            catalog: default_catalog(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageToolConfig {
    /// Fetched when the model calls the tool without a URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_url: Option<String>,

    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_page_user_agent")]
    pub user_agent: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<f64>,
}

fn default_max_chars() -> usize {
    2500
}
fn default_page_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".into()
}

impl Default for PageToolConfig {
    fn default() -> Self {
        Self {
            home_url: None,
            max_chars: default_max_chars(),
            user_agent: default_page_user_agent(),
            deadline_secs: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchToolConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_id: Option<String>,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_safe")]
    pub safe: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_search_limit")]
    pub default_limit: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<f64>,
}

fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_safe() -> String {
    "off".into()
}
fn default_language() -> String {
    "uk".into()
}
fn default_search_limit() -> u32 {
    5
}

impl Default for SearchToolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            engine_id: None,
            endpoint: default_search_endpoint(),
            safe: default_safe(),
            language: default_language(),
            default_limit: default_search_limit(),
            deadline_secs: None,
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for SearchToolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchToolConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &redact(&self.api_key))
            .field("engine_id", &self.engine_id)
            .field("endpoint", &self.endpoint)
            .field("safe", &self.safe)
            .field("language", &self.language)
            .field("default_limit", &self.default_limit)
            .field("deadline_secs", &self.deadline_secs)
            .finish()
    }
}

/// Interpret a loosely-typed flag value.
pub fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

impl AppConfig {
    /// Load configuration from the default path (~/.roomwarden/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (highest priority).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).map(|v| is_truthy(&v));
        let number = |key: &str| {
            let raw = lookup(key)?;
            match raw.trim().parse::<f64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(key, value = %raw, "Ignoring non-numeric override");
                    None
                }
            }
        };

        if let Some(room) = lookup("ROOMWARDEN_ROOM").filter(|r| !r.trim().is_empty()) {
            self.room.name = room.trim().to_string();
        }
        if let Some(enabled) = flag("ROOMWARDEN_WAIT_FOR_OCCUPANT") {
            self.occupancy.enabled = enabled;
        }
        if let Some(secs) = number("ROOMWARDEN_POLL_SECONDS") {
            self.occupancy.poll_interval_secs = secs;
        }
        if let Some(secs) = number("ROOMWARDEN_WAIT_TIMEOUT") {
            self.occupancy.wait_timeout_secs = secs;
        }
        if let Some(secs) = number("ROOMWARDEN_GREETING_DELAY") {
            self.lifecycle.greeting_delay_secs = secs;
        }
        if let Some(enabled) = flag("ROOMWARDEN_TERMINATE_ON_EMPTY") {
            self.lifecycle.terminate_on_empty = enabled;
        }
        if let Some(enabled) = flag("ROOMWARDEN_CLOSE_ROOM_ON_EMPTY") {
            self.lifecycle.close_room_on_empty = enabled;
        }
        if let Some(secs) = number("ROOMWARDEN_ROOM_EMPTY_SHUTDOWN_DELAY") {
            self.lifecycle.shutdown_delay_secs = secs;
        }
        if let Some(fps) = number("ROOMWARDEN_VIDEO_FPS_SPEAKING") {
            self.video.fps_speaking = fps;
        }
        if let Some(fps) = number("ROOMWARDEN_VIDEO_FPS_SILENT") {
            self.video.fps_silent = fps;
        }
        if let Some(tz) = lookup("ROOMWARDEN_TIMEZONE").filter(|t| !t.trim().is_empty()) {
            self.tools.time.timezone = tz.trim().to_string();
        }
        if let Some(enabled) = flag("ROOMWARDEN_ENABLE_SEARCH") {
            self.tools.search.enabled = enabled;
        }
        if let Some(key) = lookup("GOOGLE_SEARCH_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.tools.search.api_key = Some(key.trim().to_string());
        }
        if let Some(id) = lookup("GOOGLE_SEARCH_ENGINE_ID").filter(|k| !k.trim().is_empty()) {
            self.tools.search.engine_id = Some(id.trim().to_string());
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".roomwarden")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.video.fps_speaking > 0.0) || !(self.video.fps_silent > 0.0) {
            return Err(ConfigError::ValidationError(
                "video.fps_speaking and video.fps_silent must be > 0".into(),
            ));
        }

        let poll = self.occupancy.poll_interval_secs;
        if !(poll > 0.0) || poll > MAX_DURATION_SECS {
            return Err(ConfigError::ValidationError(format!(
                "occupancy.poll_interval_secs must be > 0 and at most {MAX_DURATION_SECS}"
            )));
        }

        let non_negative = [
            ("occupancy.wait_timeout_secs", self.occupancy.wait_timeout_secs),
            ("lifecycle.greeting_delay_secs", self.lifecycle.greeting_delay_secs),
            ("lifecycle.greeting_backoff_secs", self.lifecycle.greeting_backoff_secs),
            ("lifecycle.shutdown_delay_secs", self.lifecycle.shutdown_delay_secs),
            ("lifecycle.presence_resync_secs", self.lifecycle.presence_resync_secs),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) || value > MAX_DURATION_SECS {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be >= 0 and at most {MAX_DURATION_SECS}"
                )));
            }
        }

        let deadlines = [
            ("tools.default_deadline_secs", Some(self.tools.default_deadline_secs)),
            ("tools.time.deadline_secs", self.tools.time.deadline_secs),
            ("tools.feeds.deadline_secs", self.tools.feeds.deadline_secs),
            ("tools.page.deadline_secs", self.tools.page.deadline_secs),
            ("tools.search.deadline_secs", self.tools.search.deadline_secs),
        ];
        for (name, value) in deadlines {
            if let Some(secs) = value
                && (!(secs > 0.0) || secs > MAX_DURATION_SECS)
            {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be > 0 and at most {MAX_DURATION_SECS}"
                )));
            }
        }

        if self.lifecycle.greeting_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "lifecycle.greeting_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
