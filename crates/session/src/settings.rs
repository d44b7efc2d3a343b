//! Duration-typed settings the controller is constructed with.
//!
//! Built from [`AppConfig`] once at startup. The controller never looks at
//! the environment or at raw seconds.

use std::time::Duration;

use roomwarden_config::{AppConfig, OccupancyTimeoutPolicy};

use crate::sampler::VideoSamplingPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancySettings {
    pub enabled: bool,
    pub poll_interval: Duration,
    /// `None` waits forever
    pub timeout: Option<Duration>,
    pub on_timeout: OccupancyTimeoutPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub agent_identity: String,
    pub occupancy: OccupancySettings,
    pub greeting_delay: Duration,
    pub greeting_attempts: u32,
    /// Multiplied by the attempt number between greeting retries
    pub greeting_backoff: Duration,
    pub terminate_on_empty: bool,
    pub close_room_on_empty: bool,
    pub shutdown_delay: Duration,
    /// Period of the participant re-listing while joined; `None` disables
    pub presence_resync: Option<Duration>,
    pub video: VideoSamplingPolicy,
    pub video_enabled: bool,
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            agent_identity: config.room.agent_identity.clone(),
            occupancy: OccupancySettings {
                enabled: config.occupancy.enabled,
                poll_interval: config.occupancy.poll_interval(),
                timeout: config.occupancy.wait_timeout(),
                on_timeout: config.occupancy.on_timeout,
            },
            greeting_delay: config.lifecycle.greeting_delay(),
            greeting_attempts: config.lifecycle.greeting_attempts.max(1),
            greeting_backoff: config.lifecycle.greeting_backoff(),
            terminate_on_empty: config.lifecycle.terminate_on_empty,
            close_room_on_empty: config.lifecycle.close_room_on_empty,
            shutdown_delay: config.lifecycle.shutdown_delay(),
            presence_resync: config.lifecycle.presence_resync(),
            video: VideoSamplingPolicy {
                fps_speaking: config.video.fps_speaking,
                fps_silent: config.video.fps_silent,
            },
            video_enabled: config.video.enabled,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_config() {
        let settings = SessionSettings::default();
        assert_eq!(settings.agent_identity, "roomwarden");
        assert_eq!(settings.occupancy.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.occupancy.timeout, None);
        assert_eq!(settings.greeting_delay, Duration::from_millis(500));
        assert_eq!(settings.shutdown_delay, Duration::from_secs(3));
        assert!(settings.terminate_on_empty);
        assert_eq!(settings.presence_resync, Some(Duration::from_secs(5)));
        assert!(settings.video_enabled);
    }

    #[test]
    fn converts_overridden_values() {
        let mut config = AppConfig::default();
        config.occupancy.wait_timeout_secs = 12.5;
        config.occupancy.on_timeout = OccupancyTimeoutPolicy::Abort;
        config.lifecycle.close_room_on_empty = false;
        config.video.fps_silent = 0.5;
        config.lifecycle.presence_resync_secs = 0.0;

        let settings = SessionSettings::from(&config);
        assert_eq!(settings.occupancy.timeout, Some(Duration::from_millis(12_500)));
        assert_eq!(settings.occupancy.on_timeout, OccupancyTimeoutPolicy::Abort);
        assert!(!settings.close_room_on_empty);
        assert_eq!(settings.video.fps_silent, 0.5);
        assert_eq!(settings.presence_resync, None);
    }
}
