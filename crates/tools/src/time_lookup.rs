//! Time lookup tool: the current wall-clock time in the configured zone.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use roomwarden_config::TimeToolConfig;
use roomwarden_core::error::ToolError;
use roomwarden_core::tool::{Tool, ToolKind};

/// The zone the tool reports in, resolved once at construction.
#[derive(Debug, Clone, Copy)]
enum Zone {
    Named(Tz),
    Fixed(FixedOffset),
}

pub struct TimeLookupTool {
    zone: Zone,
}

impl TimeLookupTool {
    pub fn new(config: &TimeToolConfig) -> Self {
        let zone = match config.timezone.trim().parse::<Tz>() {
            Ok(tz) => Zone::Named(tz),
            Err(_) => {
                tracing::warn!(
                    timezone = %config.timezone,
                    offset_hours = config.fallback_offset_hours,
                    "Unknown timezone, using fixed offset"
                );
                let offset = FixedOffset::east_opt(config.fallback_offset_hours * 3600)
                    .unwrap_or_else(|| Utc.fix());
                Zone::Fixed(offset)
            }
        };
        Self { zone }
    }

    fn render(&self, now: DateTime<Utc>) -> serde_json::Value {
        let (local, zone_name) = match self.zone {
            Zone::Named(tz) => {
                let local = now.with_timezone(&tz);
                (local.with_timezone(&local.offset().fix()), tz.name().to_string())
            }
            Zone::Fixed(offset) => (now.with_timezone(&offset), utc_offset_label(&offset)),
        };

        serde_json::json!({
            "iso8601": local.to_rfc3339(),
            "formatted": local.format("%d.%m.%Y %H:%M:%S").to_string(),
            "utc_offset": utc_offset_label(local.offset()),
            "timezone": zone_name,
        })
    }
}

/// `UTC+03:00` style label.
fn utc_offset_label(offset: &FixedOffset) -> String {
    let total_minutes = offset.local_minus_utc() / 60;
    let sign = if total_minutes >= 0 { '+' } else { '-' };
    let abs = total_minutes.abs();
    format!("UTC{sign}{:02}:{:02}", abs / 60, abs % 60)
}

#[async_trait]
impl Tool for TimeLookupTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CurrentTime
    }

    fn description(&self) -> &str {
        "Get the current local date and time, with its UTC offset."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        Ok(self.render(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(timezone: &str, offset: i32) -> TimeToolConfig {
        TimeToolConfig {
            timezone: timezone.into(),
            fallback_offset_hours: offset,
            deadline_secs: None,
        }
    }

    #[test]
    fn named_zone_applies_daylight_saving() {
        let tool = TimeLookupTool::new(&config("Europe/Kyiv", 3));

        let summer = Utc.with_ymd_and_hms(2026, 7, 1, 9, 30, 0).unwrap();
        let out = tool.render(summer);
        assert_eq!(out["formatted"], "01.07.2026 12:30:00");
        assert_eq!(out["utc_offset"], "UTC+03:00");
        assert_eq!(out["timezone"], "Europe/Kyiv");

        let winter = Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap();
        let out = tool.render(winter);
        assert_eq!(out["formatted"], "15.01.2026 11:30:00");
        assert_eq!(out["utc_offset"], "UTC+02:00");
    }

    #[test]
    fn unknown_zone_falls_back_to_offset() {
        let tool = TimeLookupTool::new(&config("Mars/Olympus_Mons", -5));
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
        let out = tool.render(now);
        assert_eq!(out["formatted"], "28.02.2026 23:00:00");
        assert_eq!(out["utc_offset"], "UTC-05:00");
        assert_eq!(out["timezone"], "UTC-05:00");
        assert_eq!(out["iso8601"], "2026-02-28T23:00:00-05:00");
    }

    #[tokio::test]
    async fn execute_ignores_arguments() {
        let tool = TimeLookupTool::new(&TimeToolConfig::default());
        let out = tool
            .execute(serde_json::json!({ "unexpected": true }))
            .await
            .unwrap();
        assert!(out["iso8601"].is_string());
    }

    #[test]
    fn tool_definition() {
        let def = TimeLookupTool::new(&TimeToolConfig::default()).to_definition();
        assert_eq!(def.name, "current_time");
    }
}
