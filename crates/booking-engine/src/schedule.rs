//! Weekly recurring availability, blackout dates, and per-sitter admission settings.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Result, SchedulerError};
use crate::time::ClockTime;
use crate::types::SitterId;

/// Allowed values for [`AvailabilitySettings::max_daily_bookings`].
pub const DAILY_BOOKINGS_RANGE: RangeInclusive<u8> = 1..=20;
/// Allowed values for [`AvailabilitySettings::advance_notice_hours`].
pub const ADVANCE_NOTICE_RANGE: RangeInclusive<u16> = 1..=168;

/// Monday-first order used for the schedule array.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Position of `day` in a [`WeeklySchedule`].
pub fn weekday_index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

// ── DaySchedule ─────────────────────────────────────────────────────────────

/// One weekday's recurring hours.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DaySchedule {
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<ClockTime>,
}

impl DaySchedule {
    pub fn open(start: ClockTime, end: ClockTime) -> Self {
        Self {
            is_available: true,
            start_time: Some(start),
            end_time: Some(end),
        }
    }

    pub fn closed() -> Self {
        Self::default()
    }

    /// The working window, or `None` when the day is closed.
    ///
    /// Stored times on a closed day are ignored.
    pub fn window(&self) -> Option<(ClockTime, ClockTime)> {
        if !self.is_available {
            return None;
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if start < end => Some((start, end)),
            _ => None,
        }
    }

    fn validate(&self, day: Weekday) -> Result<()> {
        if !self.is_available {
            return Ok(());
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if start < end => Ok(()),
            (Some(start), Some(end)) => Err(SchedulerError::Validation(format!(
                "{}: start time {} must be before end time {}",
                day, start, end
            ))),
            _ => Err(SchedulerError::Validation(format!(
                "{}: available days need both a start and an end time",
                day
            ))),
        }
    }
}

// ── WeeklySchedule ──────────────────────────────────────────────────────────

/// Seven day entries, Monday through Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NamedWeek", into = "NamedWeek")]
pub struct WeeklySchedule {
    days: [DaySchedule; 7],
}

impl WeeklySchedule {
    pub fn new(days: [DaySchedule; 7]) -> Self {
        Self { days }
    }

    /// Weekdays open `start`–`end`, weekends closed.
    pub fn weekdays(start: ClockTime, end: ClockTime) -> Self {
        let mut days: [DaySchedule; 7] = Default::default();
        for day in &mut days[..5] {
            *day = DaySchedule::open(start, end);
        }
        Self { days }
    }

    pub fn day(&self, day: Weekday) -> &DaySchedule {
        &self.days[weekday_index(day)]
    }

    pub fn set_day(&mut self, day: Weekday, schedule: DaySchedule) {
        self.days[weekday_index(day)] = schedule;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &DaySchedule)> {
        WEEKDAYS.iter().copied().zip(self.days.iter())
    }

    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(|(day, entry)| entry.validate(day))
    }
}

/// Serialized shape with one named key per weekday.
#[derive(Serialize, Deserialize)]
struct NamedWeek {
    #[serde(default)]
    monday: DaySchedule,
    #[serde(default)]
    tuesday: DaySchedule,
    #[serde(default)]
    wednesday: DaySchedule,
    #[serde(default)]
    thursday: DaySchedule,
    #[serde(default)]
    friday: DaySchedule,
    #[serde(default)]
    saturday: DaySchedule,
    #[serde(default)]
    sunday: DaySchedule,
}

impl From<NamedWeek> for WeeklySchedule {
    fn from(w: NamedWeek) -> Self {
        WeeklySchedule::new([
            w.monday,
            w.tuesday,
            w.wednesday,
            w.thursday,
            w.friday,
            w.saturday,
            w.sunday,
        ])
    }
}

impl From<WeeklySchedule> for NamedWeek {
    fn from(s: WeeklySchedule) -> Self {
        let [monday, tuesday, wednesday, thursday, friday, saturday, sunday] = s.days;
        NamedWeek {
            monday,
            tuesday,
            wednesday,
            thursday,
            friday,
            saturday,
            sunday,
        }
    }
}

// ── AvailabilitySettings ────────────────────────────────────────────────────

/// The single live availability record for a sitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySettings {
    pub sitter_id: SitterId,
    pub weekly_schedule: WeeklySchedule,
    pub max_daily_bookings: u8,
    pub advance_notice_hours: u16,
    pub travel_distance: u32,
    #[serde(default)]
    pub holiday_rates: bool,
    #[serde(default)]
    pub weekend_rates: bool,
    /// Blackout dates, unavailable regardless of the weekly pattern.
    #[serde(default)]
    pub unavailable_dates: BTreeSet<NaiveDate>,
    pub is_active: bool,
}

impl AvailabilitySettings {
    /// Settings created on first read for a sitter that has none.
    pub fn with_defaults(sitter_id: SitterId, config: &EngineConfig) -> Self {
        Self {
            sitter_id,
            weekly_schedule: WeeklySchedule::weekdays(
                config.default_start_time,
                config.default_end_time,
            ),
            max_daily_bookings: config.settings.max_daily_bookings,
            advance_notice_hours: config.settings.advance_notice_hours,
            travel_distance: config.settings.travel_distance,
            holiday_rates: false,
            weekend_rates: false,
            unavailable_dates: BTreeSet::new(),
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.weekly_schedule.validate()?;
        if !DAILY_BOOKINGS_RANGE.contains(&self.max_daily_bookings) {
            return Err(SchedulerError::Validation(format!(
                "max_daily_bookings {} outside {:?}",
                self.max_daily_bookings, DAILY_BOOKINGS_RANGE
            )));
        }
        if !ADVANCE_NOTICE_RANGE.contains(&self.advance_notice_hours) {
            return Err(SchedulerError::Validation(format!(
                "advance_notice_hours {} outside {:?}",
                self.advance_notice_hours, ADVANCE_NOTICE_RANGE
            )));
        }
        Ok(())
    }

    pub fn is_blacked_out(&self, date: NaiveDate) -> bool {
        self.unavailable_dates.contains(&date)
    }

    /// False on blackout dates, otherwise the weekday's flag.
    pub fn is_available(&self, date: NaiveDate) -> bool {
        !self.is_blacked_out(date) && self.weekly_schedule.day(date.weekday()).is_available
    }

    /// The configured window for `date`, or `None` when the sitter is not available.
    pub fn working_window(&self, date: NaiveDate) -> Option<(ClockTime, ClockTime)> {
        if self.is_blacked_out(date) {
            return None;
        }
        self.weekly_schedule.day(date.weekday()).window()
    }

    /// Apply a partial update. The record is untouched if the result would be invalid.
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<()> {
        let mut next = self.clone();
        if let Some(schedule) = update.weekly_schedule {
            next.weekly_schedule = schedule;
        }
        if let Some(max) = update.max_daily_bookings {
            next.max_daily_bookings = max;
        }
        if let Some(hours) = update.advance_notice_hours {
            next.advance_notice_hours = hours;
        }
        if let Some(distance) = update.travel_distance {
            next.travel_distance = distance;
        }
        if let Some(flag) = update.holiday_rates {
            next.holiday_rates = flag;
        }
        if let Some(flag) = update.weekend_rates {
            next.weekend_rates = flag;
        }
        if let Some(dates) = update.unavailable_dates {
            next.unavailable_dates = dates;
        }
        if let Some(flag) = update.is_active {
            next.is_active = flag;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Add blackout dates, returning how many were new.
    pub fn add_unavailable_dates(&mut self, dates: impl IntoIterator<Item = NaiveDate>) -> usize {
        dates
            .into_iter()
            .filter(|d| self.unavailable_dates.insert(*d))
            .count()
    }

    /// Remove blackout dates, returning how many were present.
    pub fn remove_unavailable_dates(
        &mut self,
        dates: impl IntoIterator<Item = NaiveDate>,
    ) -> usize {
        dates
            .into_iter()
            .filter(|d| self.unavailable_dates.remove(d))
            .count()
    }
}

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub weekly_schedule: Option<WeeklySchedule>,
    pub max_daily_bookings: Option<u8>,
    pub advance_notice_hours: Option<u16>,
    pub travel_distance: Option<u32>,
    pub holiday_rates: Option<bool>,
    pub weekend_rates: Option<bool>,
    pub unavailable_dates: Option<BTreeSet<NaiveDate>>,
    pub is_active: Option<bool>,
}
