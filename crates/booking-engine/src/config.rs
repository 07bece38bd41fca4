//! Engine configuration: business timezone, default hours, rates and limits.
//!
//! Every default the scheduler and expander fall back to lives here and is
//! handed to them at construction. Nothing is read from the environment.

use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::error::{Result, SchedulerError};
use crate::schedule::{ADVANCE_NOTICE_RANGE, DAILY_BOOKINGS_RANGE};
use crate::time::{ClockTime, MINUTES_PER_DAY};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timezone in which all wall-clock booking times are interpreted.
    pub timezone: Tz,
    /// Start time used when a request omits one.
    pub default_start_time: ClockTime,
    /// End time used when a request omits one.
    pub default_end_time: ClockTime,
    /// Length forced onto a daily window whose end is not after its start.
    pub min_window_minutes: u32,
    /// Per-day amount in cents when the request carries no rate.
    pub default_daily_rate: u64,
    /// Upper bound on the number of days a single request may expand to.
    pub max_range_days: u32,
    pub dst_policy: DstPolicy,
    /// Values used when a sitter's settings are created lazily.
    pub settings: SettingsDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::America__Toronto,
            default_start_time: ClockTime::from_hm(9, 0).unwrap_or(ClockTime::MIDNIGHT),
            default_end_time: ClockTime::from_hm(17, 0).unwrap_or(ClockTime::MIDNIGHT),
            min_window_minutes: 60,
            default_daily_rate: 4600,
            max_range_days: 366,
            dst_policy: DstPolicy::default(),
            settings: SettingsDefaults::default(),
        }
    }
}

/// Defaults applied to a sitter's first [`AvailabilitySettings`](crate::schedule::AvailabilitySettings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDefaults {
    pub max_daily_bookings: u8,
    pub advance_notice_hours: u16,
    pub travel_distance: u32,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            max_daily_bookings: 5,
            advance_notice_hours: 24,
            travel_distance: 10,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SchedulerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| SchedulerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_start_time >= self.default_end_time {
            return Err(SchedulerError::Config(format!(
                "default_start_time {} must be before default_end_time {}",
                self.default_start_time, self.default_end_time
            )));
        }
        // A stretched window of a day or more would overlap the next day's interval.
        if self.min_window_minutes == 0 || self.min_window_minutes >= MINUTES_PER_DAY {
            return Err(SchedulerError::Config(format!(
                "min_window_minutes must be within 1..{}",
                MINUTES_PER_DAY
            )));
        }
        if self.max_range_days == 0 {
            return Err(SchedulerError::Config(
                "max_range_days must be positive".to_string(),
            ));
        }
        if !DAILY_BOOKINGS_RANGE.contains(&self.settings.max_daily_bookings) {
            return Err(SchedulerError::Config(format!(
                "settings.max_daily_bookings must be within {:?}",
                DAILY_BOOKINGS_RANGE
            )));
        }
        if !ADVANCE_NOTICE_RANGE.contains(&self.settings.advance_notice_hours) {
            return Err(SchedulerError::Config(format!(
                "settings.advance_notice_hours must be within {:?}",
                ADVANCE_NOTICE_RANGE
            )));
        }
        Ok(())
    }
}
