//! Time-of-day parsing and wall-clock → instant conversion.
//!
//! Client-entered times arrive in several shapes ("14:30", "5 PM", "9").
//! Everything is normalized to minutes since midnight, and every comparison
//! against bookings happens on absolute instants computed in the business
//! timezone, never on naive local timestamps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::error::{Result, SchedulerError};

/// Minutes in a day; valid minute values are `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u32 = 1440;

// ── ClockTime ───────────────────────────────────────────────────────────────

/// A wall-clock time of day, stored as minutes since midnight.
///
/// Serializes as a strict 24-hour `"HH:mm"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    /// Build from minutes since midnight. Returns `None` for values ≥ 1440.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(ClockTime(minutes as u16))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(ClockTime((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    pub fn minutes(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_minutes(self.minutes()))
    }
}

impl FromStr for ClockTime {
    type Err = SchedulerError;

    /// Strict `"HH:mm"` parsing. Lenient client input goes through
    /// [`parse_time_to_minutes`] instead.
    fn from_str(s: &str) -> Result<Self> {
        parse_24h(s.trim())
            .and_then(ClockTime::from_minutes)
            .ok_or_else(|| SchedulerError::Validation(format!("invalid time '{}', expected HH:mm", s)))
    }
}

impl TryFrom<String> for ClockTime {
    type Error = SchedulerError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

// ── Parsing ─────────────────────────────────────────────────────────────────

/// Parse a free-form time string into minutes since midnight.
///
/// Accepted shapes:
/// - `"HH:mm"` 24-hour (`"14:30"` → 870)
/// - `"H[:mm] AM/PM"`, case-insensitive, space optional (`"5 PM"` → 1020, `"12am"` → 0)
/// - bare hour `"H"` / `"HH"` in 24-hour time (`"9"` → 540)
///
/// Anything else (including `"25:00"`) yields `None`.
pub fn try_parse_time(text: &str) -> Option<u32> {
    let upper = text.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }

    if let Some(body) = upper.strip_suffix("AM") {
        return parse_12h(body.trim_end(), false);
    }
    if let Some(body) = upper.strip_suffix("PM") {
        return parse_12h(body.trim_end(), true);
    }
    if upper.contains(':') {
        return parse_24h(&upper);
    }

    let hour = parse_digits(&upper, 1, 2)?;
    (hour < 24).then_some(hour * 60)
}

/// Like [`try_parse_time`], but returns `fallback` on no match and logs the
/// rejected input. Never fails.
pub fn parse_time_to_minutes(text: &str, fallback: u32) -> u32 {
    match try_parse_time(text) {
        Some(minutes) => minutes,
        None => {
            tracing::warn!(
                input = text,
                fallback = %format_minutes(fallback),
                "unrecognized time format, using fallback"
            );
            fallback
        }
    }
}

/// Format minutes since midnight as zero-padded `"HH:mm"`.
pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn parse_24h(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    let hour = parse_digits(h, 1, 2)?;
    let minute = parse_digits(m, 2, 2)?;
    (hour < 24 && minute < 60).then_some(hour * 60 + minute)
}

fn parse_12h(body: &str, pm: bool) -> Option<u32> {
    let (hour, minute) = match body.split_once(':') {
        Some((h, m)) => (parse_digits(h, 1, 2)?, parse_digits(m, 2, 2)?),
        None => (parse_digits(body, 1, 2)?, 0),
    };
    if !(1..=12).contains(&hour) || minute >= 60 {
        return None;
    }
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    Some(hour * 60 + minute)
}

fn parse_digits(s: &str, min_len: usize, max_len: usize) -> Option<u32> {
    if s.len() < min_len || s.len() > max_len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse an IANA timezone name into `Tz`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| SchedulerError::InvalidTimezone(format!("'{}'", name)))
}

/// Parse a strict `"YYYY-MM-DD"` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| SchedulerError::InvalidDate(format!("'{}': {}", s, e)))
}

/// Parse a requested range boundary, dropping any time-of-day.
///
/// Accepts a bare `"YYYY-MM-DD"` or an RFC 3339 datetime; datetimes are
/// normalized to their UTC calendar date (midnight) so partial-day inputs
/// cannot shift the day count.
pub fn parse_request_date(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|e| SchedulerError::InvalidDate(format!("'{}': {}", s, e)))
}

// ── Wall clock → instant ────────────────────────────────────────────────────

/// Interpret `time` on `date` as wall-clock time in `tz` and return the
/// equivalent UTC instant.
///
/// Ambiguous local times (the repeated hour on fall-back) resolve to the
/// earlier instant. Local times inside a spring-forward gap are handled by
/// `policy`.
///
/// # Errors
///
/// Returns [`SchedulerError::Validation`] when the local time does not exist
/// and `policy` is [`DstPolicy::Skip`].
pub fn local_to_instant(
    date: NaiveDate,
    time: ClockTime,
    tz: Tz,
    policy: DstPolicy,
) -> Result<DateTime<Utc>> {
    let naive = date.and_time(chrono::NaiveTime::MIN) + Duration::minutes(time.minutes() as i64);

    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Ok(dt.with_timezone(&Utc));
    }

    match policy {
        DstPolicy::Skip => Err(SchedulerError::Validation(format!(
            "{} {} does not exist in {}",
            date, time, tz
        ))),
        DstPolicy::ShiftForward => shift_past_gap(naive, tz),
    }
}

/// Resolve a non-existent local time using the offset in effect before the gap.
fn shift_past_gap(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>> {
    let before = tz
        .from_local_datetime(&(naive - Duration::hours(3)))
        .earliest()
        .ok_or_else(|| {
            SchedulerError::Validation(format!("cannot resolve {} in {}", naive, tz))
        })?;
    let offset_seconds = before.offset().fix().local_minus_utc() as i64;
    Ok(Utc.from_utc_datetime(&(naive - Duration::seconds(offset_seconds))))
}
