//! Range expansion -- turns a client's date range into independent daily intervals.
//!
//! A request for `2024-06-01..=2024-06-03, 09:00-17:00` becomes three
//! intervals, each with its own absolute start and end computed in the
//! business timezone, so DST changes inside the range land on the right
//! instants.

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::ServiceDetails;
use crate::config::EngineConfig;
use crate::error::{Result, SchedulerError};
use crate::slots::TimeWindow;
use crate::time::{self, ClockTime};
use crate::types::{ClientId, SitterId};

/// A client's booking request as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub client_id: ClientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitter_id: Option<SitterId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Free-form time of day ("14:00", "2 PM", "14").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(flatten)]
    pub service: ServiceDetails,
    /// Per-day amount in cents; the configured default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_rate: Option<u64>,
}

/// Resolved daily times after parsing and the minimum-window rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTimes {
    pub start: ClockTime,
    pub end: ClockTime,
    /// Set when the requested end was not after the start and the window was
    /// stretched to the configured minimum instead.
    pub stretched: bool,
}

/// One calendar day of a request, with absolute instants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayInterval {
    pub date: NaiveDate,
    /// Local minutes covered on `date`. `end` may exceed 1440 when a
    /// stretched window crosses midnight.
    pub window: TimeWindow,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A single day's booking, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDraft {
    #[serde(flatten)]
    pub interval: DayInterval,
    /// Amount for this day, in cents.
    pub amount: u64,
    pub service: ServiceDetails,
}

/// Expands date ranges using the engine's timezone and defaults.
#[derive(Debug, Clone, Copy)]
pub struct RangeExpander<'a> {
    config: &'a EngineConfig,
}

impl<'a> RangeExpander<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Inclusive number of calendar days from `start` to `end`.
    ///
    /// # Errors
    /// Returns `SchedulerError::Validation` if `end` is before `start` or the
    /// range exceeds `max_range_days`.
    pub fn day_count(&self, start: NaiveDate, end: NaiveDate) -> Result<u32> {
        let diff = (end - start).num_days();
        if diff < 0 {
            return Err(SchedulerError::Validation(format!(
                "end date {} is before start date {}",
                end, start
            )));
        }
        let days = diff + 1;
        if days > self.config.max_range_days as i64 {
            return Err(SchedulerError::Validation(format!(
                "range of {} days exceeds the limit of {}",
                days, self.config.max_range_days
            )));
        }
        Ok(days as u32)
    }

    /// Every calendar date in `start..=end`.
    pub fn dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        let count = self.day_count(start, end)?;
        (0..count as u64)
            .map(|i| {
                start.checked_add_days(Days::new(i)).ok_or_else(|| {
                    SchedulerError::InvalidDate(format!("{} + {} days is out of range", start, i))
                })
            })
            .collect()
    }

    /// Parse requested times, applying configured defaults and the minimum window.
    pub fn resolve_times(&self, start: Option<&str>, end: Option<&str>) -> DailyTimes {
        let start_minutes = parse_or_default(start, self.config.default_start_time);
        let mut end_minutes = parse_or_default(end, self.config.default_end_time);

        let stretched = end_minutes <= start_minutes;
        if stretched {
            end_minutes = start_minutes.saturating_add(self.config.min_window_minutes);
            tracing::debug!(
                start = %time::format_minutes(start_minutes),
                minutes = self.config.min_window_minutes,
                "end time not after start, stretching to minimum window"
            );
        }

        // Past midnight the local end is not representable; the interval's
        // instants carry the real end.
        let end = ClockTime::from_minutes(end_minutes).unwrap_or(ClockTime::MIDNIGHT);
        DailyTimes {
            start: ClockTime::from_minutes(start_minutes).unwrap_or(ClockTime::MIDNIGHT),
            end,
            stretched,
        }
    }

    /// One interval per date in the range, each with timezone-correct instants.
    pub fn intervals(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_time: Option<&str>,
        end_time: Option<&str>,
    ) -> Result<Vec<DayInterval>> {
        let times = self.resolve_times(start_time, end_time);
        self.dates(start_date, end_date)?
            .into_iter()
            .map(|date| self.day_interval(date, times))
            .collect()
    }

    /// Expand a booking request into one draft per day.
    ///
    /// The first draft is the representative used for notifications.
    pub fn expand(&self, request: &BookingRequest) -> Result<Vec<DailyDraft>> {
        let amount = request.daily_rate.unwrap_or(self.config.default_daily_rate);
        let drafts = self
            .intervals(
                request.start_date,
                request.end_date,
                request.start_time.as_deref(),
                request.end_time.as_deref(),
            )?
            .into_iter()
            .map(|interval| DailyDraft {
                interval,
                amount,
                service: request.service.clone(),
            })
            .collect::<Vec<_>>();
        tracing::debug!(
            client = %request.client_id,
            days = drafts.len(),
            "expanded booking request"
        );
        Ok(drafts)
    }

    fn day_interval(&self, date: NaiveDate, times: DailyTimes) -> Result<DayInterval> {
        let tz = self.config.timezone;
        let policy = self.config.dst_policy;
        let start = time::local_to_instant(date, times.start, tz, policy)?;
        let (end, window) = if times.stretched {
            let minutes = self.config.min_window_minutes;
            (
                start + Duration::minutes(minutes as i64),
                TimeWindow {
                    start: times.start.minutes(),
                    end: times.start.minutes().saturating_add(minutes),
                },
            )
        } else {
            (
                time::local_to_instant(date, times.end, tz, policy)?,
                TimeWindow {
                    start: times.start.minutes(),
                    end: times.end.minutes(),
                },
            )
        };
        Ok(DayInterval {
            date,
            window,
            start,
            end,
        })
    }
}

fn parse_or_default(text: Option<&str>, default: ClockTime) -> u32 {
    match text {
        Some(text) => time::parse_time_to_minutes(text, default.minutes()),
        None => default.minutes(),
    }
}
