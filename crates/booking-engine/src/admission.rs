//! Admission control: decide whether a requested range can become bookings.
//!
//! Two entry points with different contracts:
//!
//! - [`Scheduler::create_booking`] runs only the interval-conflict check and
//!   either persists every day of the request or nothing.
//! - [`Scheduler::check_availability`] is diagnostic. It evaluates every rule
//!   (conflicts, sitter status, blackout and weekday, lead time, capacity)
//!   and accumulates all reasons instead of stopping at the first.
//!
//! The two intentionally disagree: capacity and lead time can make the check
//! report "unavailable" while creation still admits.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::batch::BatchOutcome;
use crate::booking::{Booking, BookingStatus, BookingStore};
use crate::config::EngineConfig;
use crate::directory::{SitterDirectory, SitterProfile};
use crate::error::{Result, SchedulerError};
use crate::expander::{BookingRequest, DayInterval, RangeExpander};
use crate::freebusy::{self, OpenWindow};
use crate::notify::Notifier;
use crate::schedule::{AvailabilitySettings, SettingsUpdate};
use crate::slots::{AvailabilitySlot, NewSlot, SlotStore, SlotUpdate};
use crate::time::{self, ClockTime};
use crate::types::{BookingId, SitterId, SlotId};

/// Reason string for the creation path's only rejection rule.
pub const BOOKING_CONFLICT_MESSAGE: &str = "dates conflict with existing bookings";

// ── Queries and results ─────────────────────────────────────────────────────

/// Input to [`Scheduler::check_availability`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub sitter_id: SitterId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

/// Input to [`Scheduler::find_available_sitters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitterSearch {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub pet_types: BTreeSet<String>,
}

/// Why a range is not available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictReason {
    BookingConflict { booking_ids: Vec<BookingId> },
    SitterInactive,
    Blackout { date: NaiveDate },
    WeekdayUnavailable { date: NaiveDate, weekday: String },
    InsufficientNotice { required_hours: u16, hours_until_start: i64 },
    CapacityReached { existing: usize, max_daily_bookings: u8 },
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::BookingConflict { .. } => f.write_str(BOOKING_CONFLICT_MESSAGE),
            ConflictReason::SitterInactive => f.write_str("sitter is not accepting bookings"),
            ConflictReason::Blackout { date } => write!(f, "{} is marked unavailable", date),
            ConflictReason::WeekdayUnavailable { date, weekday } => {
                write!(f, "sitter does not work on {} ({})", weekday, date)
            }
            ConflictReason::InsufficientNotice {
                required_hours,
                hours_until_start,
            } => write!(
                f,
                "requires {} hours advance notice, only {} hours until start",
                required_hours, hours_until_start
            ),
            ConflictReason::CapacityReached {
                existing,
                max_daily_bookings,
            } => write!(
                f,
                "sitter already has {} bookings in this range (maximum {})",
                existing, max_daily_bookings
            ),
        }
    }
}

/// Diagnostic result of an availability check.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityReport {
    pub is_available: bool,
    /// Open explicit slots dated within the range.
    pub available_slots: Vec<AvailabilitySlot>,
    pub settings: AvailabilitySettings,
    pub conflicts: Vec<ConflictReason>,
    /// Free parts of each available day's working window.
    pub open_windows: Vec<OpenWindow>,
}

impl AvailabilityReport {
    pub fn messages(&self) -> Vec<String> {
        self.conflicts.iter().map(ToString::to_string).collect()
    }
}

/// An admitted request: one pending booking per day.
#[derive(Debug, Clone, Serialize)]
pub struct Admission {
    pub bookings: Vec<Booking>,
    /// Sum of the daily amounts, in cents.
    pub total_amount: u64,
}

impl Admission {
    pub fn booking_ids(&self) -> Vec<BookingId> {
        self.bookings.iter().map(|b| b.id).collect()
    }
}

// ── Scheduler ───────────────────────────────────────────────────────────────

/// Owns availability state and runs admission against it.
///
/// Mutating operations take `&mut self`, so a conflict check and the insert
/// that follows it cannot interleave with another request. Use
/// [`SharedScheduler`](crate::shared::SharedScheduler) to share one across threads.
pub struct Scheduler {
    config: EngineConfig,
    settings: HashMap<SitterId, AvailabilitySettings>,
    slots: SlotStore,
    bookings: BookingStore,
    directory: Box<dyn SitterDirectory>,
    notifier: Box<dyn Notifier>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("timezone", &self.config.timezone)
            .field("settings", &self.settings.len())
            .field("slots", &self.slots.len())
            .field("bookings", &self.bookings.len())
            .finish()
    }
}

impl Scheduler {
    pub fn new(
        config: EngineConfig,
        directory: impl SitterDirectory + 'static,
        notifier: impl Notifier + 'static,
    ) -> Self {
        Self {
            config,
            settings: HashMap::new(),
            slots: SlotStore::new(),
            bookings: BookingStore::new(),
            directory: Box::new(directory),
            notifier: Box::new(notifier),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn expander(&self) -> RangeExpander<'_> {
        RangeExpander::new(&self.config)
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub fn bookings(&self) -> &BookingStore {
        &self.bookings
    }

    // ── Settings ────────────────────────────────────────────────────────────

    /// The sitter's settings, created with defaults on first read.
    pub fn settings(&mut self, sitter_id: &SitterId) -> &AvailabilitySettings {
        self.settings_mut(sitter_id)
    }

    /// Stored settings without creating defaults.
    pub fn stored_settings(&self) -> impl Iterator<Item = &AvailabilitySettings> {
        self.settings.values()
    }

    /// Upsert the sitter's settings.
    pub fn update_settings(
        &mut self,
        sitter_id: &SitterId,
        update: SettingsUpdate,
    ) -> Result<AvailabilitySettings> {
        let settings = self.settings_mut(sitter_id);
        settings.apply(update)?;
        tracing::debug!(sitter = %sitter_id, "availability settings updated");
        Ok(settings.clone())
    }

    pub fn add_unavailable_dates(
        &mut self,
        sitter_id: &SitterId,
        dates: impl IntoIterator<Item = NaiveDate>,
    ) -> usize {
        self.settings_mut(sitter_id).add_unavailable_dates(dates)
    }

    pub fn remove_unavailable_dates(
        &mut self,
        sitter_id: &SitterId,
        dates: impl IntoIterator<Item = NaiveDate>,
    ) -> usize {
        self.settings_mut(sitter_id).remove_unavailable_dates(dates)
    }

    fn settings_mut(&mut self, sitter_id: &SitterId) -> &mut AvailabilitySettings {
        let config = &self.config;
        self.settings.entry(sitter_id.clone()).or_insert_with(|| {
            tracing::debug!(sitter = %sitter_id, "creating default availability settings");
            AvailabilitySettings::with_defaults(sitter_id.clone(), config)
        })
    }

    pub(crate) fn restore_settings(&mut self, settings: AvailabilitySettings) -> Result<()> {
        settings.validate()?;
        self.settings.insert(settings.sitter_id.clone(), settings);
        Ok(())
    }

    // ── Slots ───────────────────────────────────────────────────────────────

    pub fn create_slot(&mut self, new: NewSlot) -> Result<AvailabilitySlot> {
        self.slots.create(new)
    }

    pub fn update_slot(
        &mut self,
        sitter_id: &SitterId,
        id: SlotId,
        update: SlotUpdate,
    ) -> Result<AvailabilitySlot> {
        self.slots.update(sitter_id, id, update)
    }

    pub fn delete_slot(&mut self, sitter_id: &SitterId, id: SlotId) -> Result<AvailabilitySlot> {
        self.slots.delete(sitter_id, id)
    }

    pub fn bulk_create_slots(
        &mut self,
        items: Vec<NewSlot>,
    ) -> BatchOutcome<AvailabilitySlot, NewSlot> {
        self.slots.bulk_create(items)
    }

    pub fn bulk_delete_slots(&mut self, sitter_id: &SitterId, ids: &[SlotId]) -> usize {
        self.slots.bulk_delete(sitter_id, ids)
    }

    pub(crate) fn restore_slot(&mut self, slot: AvailabilitySlot) -> Result<()> {
        self.slots.insert(slot)
    }

    pub(crate) fn restore_booking(&mut self, booking: Booking) -> Result<()> {
        self.bookings.insert(booking)
    }

    // ── Booking creation ────────────────────────────────────────────────────

    /// Admit a booking request, creating one pending booking per day.
    ///
    /// Only the interval-conflict rule applies here: if any day intersects an
    /// active booking (the named sitter's, or any booking when no sitter is
    /// named) the whole request is rejected and nothing is stored.
    ///
    /// # Errors
    /// - `Validation` for a reversed or oversized range, an inactive sitter, or
    ///   a total amount that does not fit in `u64` cents
    /// - `NotFound` for an unknown sitter
    /// - `Conflict` when any day collides with an active booking
    pub fn create_booking(
        &mut self,
        request: BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        let drafts = self.expander().expand(&request)?;
        let total_amount = drafts
            .iter()
            .try_fold(0u64, |sum, d| sum.checked_add(d.amount))
            .ok_or_else(|| {
                SchedulerError::Validation(format!(
                    "total for {} days at the requested rate exceeds the supported amount",
                    drafts.len()
                ))
            })?;

        if let Some(sitter_id) = &request.sitter_id {
            self.require_active_sitter(sitter_id)?;
        }

        let clashing: BTreeSet<BookingId> = drafts
            .iter()
            .flat_map(|d| {
                self.bookings.conflicts(
                    d.interval.start,
                    d.interval.end,
                    request.sitter_id.as_ref(),
                    None,
                )
            })
            .map(|b| b.id)
            .collect();
        if !clashing.is_empty() {
            tracing::debug!(
                client = %request.client_id,
                clashes = clashing.len(),
                "rejecting booking request"
            );
            return Err(SchedulerError::Conflict(BOOKING_CONFLICT_MESSAGE.to_string()));
        }

        let mut bookings = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let booking = Booking {
                id: BookingId::generate(),
                client_id: request.client_id.clone(),
                sitter_id: request.sitter_id.clone(),
                start: draft.interval.start,
                end: draft.interval.end,
                status: BookingStatus::Pending,
                total_amount: draft.amount,
                service: draft.service,
                created_at: now,
            };
            if let Some(sitter_id) = &request.sitter_id {
                self.slots
                    .consume(sitter_id, draft.interval.date, draft.interval.window, booking.id);
            }
            self.bookings.insert(booking.clone())?;
            bookings.push(booking);
        }

        tracing::info!(
            client = %request.client_id,
            days = bookings.len(),
            total_amount,
            "booking request admitted"
        );

        if let Some(representative) = bookings.first() {
            if let Err(e) = self.notifier.booking_admitted(representative, &bookings) {
                tracing::warn!(booking = %representative.id, error = %e, "notification dropped");
            }
        }

        Ok(Admission {
            bookings,
            total_amount,
        })
    }

    // ── Availability check ──────────────────────────────────────────────────

    /// Evaluate every admission rule for a sitter and range, collecting all reasons.
    ///
    /// `now` anchors the advance-notice rule.
    pub fn check_availability(
        &mut self,
        query: &AvailabilityQuery,
        now: DateTime<Utc>,
    ) -> Result<AvailabilityReport> {
        let profile = self
            .directory
            .get(&query.sitter_id)
            .ok_or_else(|| SchedulerError::not_found("sitter", &query.sitter_id))?;
        let intervals = self.expander().intervals(
            query.start_date,
            query.end_date,
            query.start_time.as_deref(),
            query.end_time.as_deref(),
        )?;
        let settings = self.settings(&query.sitter_id).clone();
        let sitter_id = &query.sitter_id;

        let mut conflicts = Vec::new();

        let clashing: BTreeSet<BookingId> = intervals
            .iter()
            .flat_map(|i| self.bookings.conflicts(i.start, i.end, Some(sitter_id), None))
            .map(|b| b.id)
            .collect();
        if !clashing.is_empty() {
            conflicts.push(ConflictReason::BookingConflict {
                booking_ids: clashing.into_iter().collect(),
            });
        }

        if !settings.is_active || !profile.is_active {
            conflicts.push(ConflictReason::SitterInactive);
        }

        for interval in &intervals {
            if settings.is_blacked_out(interval.date) {
                conflicts.push(ConflictReason::Blackout {
                    date: interval.date,
                });
            } else if !settings.is_available(interval.date) {
                conflicts.push(ConflictReason::WeekdayUnavailable {
                    date: interval.date,
                    weekday: weekday_name(interval.date.weekday()).to_string(),
                });
            }
        }

        if let Some(first) = intervals.first() {
            let lead = first.start - now;
            if lead < Duration::hours(settings.advance_notice_hours as i64) {
                conflicts.push(ConflictReason::InsufficientNotice {
                    required_hours: settings.advance_notice_hours,
                    hours_until_start: lead.num_hours(),
                });
            }
        }

        let (range_start, range_end) = self.local_day_bounds(query.start_date, query.end_date)?;
        let existing = self
            .bookings
            .active_for_sitter(sitter_id, range_start, range_end)
            .len();
        if existing >= settings.max_daily_bookings as usize {
            conflicts.push(ConflictReason::CapacityReached {
                existing,
                max_daily_bookings: settings.max_daily_bookings,
            });
        }

        let available_slots = self
            .slots
            .slots_in_range(sitter_id, query.start_date, query.end_date)
            .into_iter()
            .filter(|s| s.is_open())
            .cloned()
            .collect();
        let open_windows = self.open_windows(sitter_id, &settings, &intervals)?;

        tracing::debug!(
            sitter = %sitter_id,
            reasons = conflicts.len(),
            "availability checked"
        );

        Ok(AvailabilityReport {
            is_available: conflicts.is_empty(),
            available_slots,
            settings,
            conflicts,
            open_windows,
        })
    }

    /// Free parts of each available day's working window, after active bookings.
    fn open_windows(
        &self,
        sitter_id: &SitterId,
        settings: &AvailabilitySettings,
        intervals: &[DayInterval],
    ) -> Result<Vec<OpenWindow>> {
        let mut open = Vec::new();
        for interval in intervals {
            let Some((start, end)) = settings.working_window(interval.date) else {
                continue;
            };
            let window_start = self.instant(interval.date, start)?;
            let window_end = self.instant(interval.date, end)?;
            let held = self
                .bookings
                .active_for_sitter(sitter_id, window_start, window_end);
            open.extend(freebusy::find_open_windows(&held, window_start, window_end));
        }
        Ok(open)
    }

    // ── Sitter search ───────────────────────────────────────────────────────

    /// Active sitters with no conflicting booking on any day of the range and
    /// who service every requested pet type.
    pub fn find_available_sitters(&self, search: &SitterSearch) -> Result<Vec<SitterProfile>> {
        let intervals = self.expander().intervals(
            search.start_date,
            search.end_date,
            search.start_time.as_deref(),
            search.end_time.as_deref(),
        )?;
        Ok(self
            .directory
            .active_sitters()
            .into_iter()
            .filter(|s| s.services_all(&search.pet_types))
            .filter(|s| {
                intervals.iter().all(|i| {
                    self.bookings
                        .conflicts(i.start, i.end, Some(&s.id), None)
                        .is_empty()
                })
            })
            .collect())
    }

    // ── Booking lifecycle ───────────────────────────────────────────────────

    /// Assign a sitter to an existing active booking.
    ///
    /// The sitter must be free for that booking's interval.
    pub fn assign_sitter(&mut self, booking_id: BookingId, sitter_id: SitterId) -> Result<Booking> {
        self.require_active_sitter(&sitter_id)?;
        let booking = self
            .bookings
            .get(booking_id)
            .ok_or_else(|| SchedulerError::not_found("booking", booking_id))?;
        if !booking.status.is_active() {
            return Err(SchedulerError::Validation(format!(
                "booking {} is {:?} and cannot be assigned",
                booking_id, booking.status
            )));
        }
        let (start, end, status) = (booking.start, booking.end, booking.status);
        if !self
            .bookings
            .conflicts(start, end, Some(&sitter_id), Some(booking_id))
            .is_empty()
        {
            return Err(SchedulerError::Conflict(BOOKING_CONFLICT_MESSAGE.to_string()));
        }

        self.bookings.assign(booking_id, sitter_id)?;
        if status.can_transition_to(BookingStatus::Assigned) {
            self.bookings.set_status(booking_id, BookingStatus::Assigned)?;
        }
        self.snapshot_booking(booking_id)
    }

    /// Move a booking through its lifecycle. Cancelling frees consumed slots.
    pub fn update_status(&mut self, booking_id: BookingId, status: BookingStatus) -> Result<Booking> {
        self.bookings.set_status(booking_id, status)?;
        if status == BookingStatus::Cancelled {
            let released = self.slots.release(booking_id);
            tracing::debug!(booking = %booking_id, released, "booking cancelled");
        }
        self.snapshot_booking(booking_id)
    }

    pub fn cancel_booking(&mut self, booking_id: BookingId) -> Result<Booking> {
        self.update_status(booking_id, BookingStatus::Cancelled)
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn require_active_sitter(&self, sitter_id: &SitterId) -> Result<SitterProfile> {
        let profile = self
            .directory
            .get(sitter_id)
            .ok_or_else(|| SchedulerError::not_found("sitter", sitter_id))?;
        if !profile.is_active {
            return Err(SchedulerError::Validation(format!(
                "sitter {} is not active",
                sitter_id
            )));
        }
        Ok(profile)
    }

    fn snapshot_booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.bookings
            .get(booking_id)
            .cloned()
            .ok_or_else(|| SchedulerError::not_found("booking", booking_id))
    }

    fn instant(&self, date: NaiveDate, at: ClockTime) -> Result<DateTime<Utc>> {
        time::local_to_instant(date, at, self.config.timezone, self.config.dst_policy)
    }

    /// Local midnight of `from` to local midnight after `to`.
    fn local_day_bounds(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let after = to
            .checked_add_days(Days::new(1))
            .ok_or_else(|| SchedulerError::InvalidDate(format!("{} + 1 day is out of range", to)))?;
        Ok((
            self.instant(from, ClockTime::MIDNIGHT)?,
            self.instant(after, ClockTime::MIDNIGHT)?,
        ))
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
