//! Discrete bookable slots and same-day overlap detection.
//!
//! Slots for one (sitter, date) are kept sorted by start time. Because the
//! store never admits two overlapping slots on the same day, ends are sorted
//! too, and the first possible overlap is found with a binary search.
//! Intervals are half-open: a slot ending at 10:00 and one starting at 10:00
//! do not overlap.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::batch::BatchOutcome;
use crate::error::{Result, SchedulerError};
use crate::time::ClockTime;
use crate::types::{BookingId, SitterId, SlotId};

/// A half-open `[start, end)` range of minutes within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: u32,
    pub end: u32,
}

impl TimeWindow {
    /// Build a window, rejecting empty or reversed ranges.
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self> {
        if start >= end {
            return Err(SchedulerError::Validation(format!(
                "start time {} must be before end time {}",
                start, end
            )));
        }
        Ok(Self {
            start: start.minutes(),
            end: end.minutes(),
        })
    }

    pub fn contains(&self, other: TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Two windows overlap iff `a.start < b.end && b.start < a.end`.
///
/// Touching endpoints are not an overlap.
pub fn overlaps(a: TimeWindow, b: TimeWindow) -> bool {
    a.start < b.end && b.start < a.end
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    #[default]
    Regular,
    Emergency,
    Holiday,
}

/// An individually managed bookable interval on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: SlotId,
    pub sitter_id: SitterId,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub is_available: bool,
    /// Set once the slot is consumed by a booking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<BookingId>,
    #[serde(default)]
    pub slot_type: SlotType,
    /// Per-slot rate in cents, overriding the sitter's usual rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rate: Option<u64>,
}

impl AvailabilitySlot {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time.minutes(),
            end: self.end_time.minutes(),
        }
    }

    /// Available and not yet consumed by a booking.
    pub fn is_open(&self) -> bool {
        self.is_available && self.booking_id.is_none()
    }
}

/// Slot creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSlot {
    pub sitter_id: SitterId,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub slot_type: SlotType,
    #[serde(default)]
    pub custom_rate: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl NewSlot {
    pub fn new(sitter_id: SitterId, date: NaiveDate, start: ClockTime, end: ClockTime) -> Self {
        Self {
            sitter_id,
            date,
            start_time: start,
            end_time: end,
            is_available: true,
            slot_type: SlotType::Regular,
            custom_rate: None,
        }
    }
}

/// Partial slot update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotUpdate {
    pub start_time: Option<ClockTime>,
    pub end_time: Option<ClockTime>,
    pub is_available: Option<bool>,
    pub slot_type: Option<SlotType>,
    pub custom_rate: Option<u64>,
}

/// In-memory slot storage keyed by sitter, then date.
#[derive(Debug, Default)]
pub struct SlotStore {
    days: HashMap<SitterId, BTreeMap<NaiveDate, Vec<AvailabilitySlot>>>,
    locator: HashMap<SlotId, (SitterId, NaiveDate)>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.locator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locator.is_empty()
    }

    /// The first slot for (sitter, date) overlapping `candidate`.
    pub fn find_overlap(
        &self,
        sitter_id: &SitterId,
        date: NaiveDate,
        candidate: TimeWindow,
    ) -> Option<&AvailabilitySlot> {
        self.find_overlap_excluding(sitter_id, date, candidate, None)
    }

    fn find_overlap_excluding(
        &self,
        sitter_id: &SitterId,
        date: NaiveDate,
        candidate: TimeWindow,
        exclude: Option<SlotId>,
    ) -> Option<&AvailabilitySlot> {
        let slots = self.days.get(sitter_id)?.get(&date)?;
        // Ends are sorted, so everything before `first` ends at or before the candidate starts.
        let first = slots.partition_point(|s| s.end_time.minutes() <= candidate.start);
        slots[first..]
            .iter()
            .take_while(|s| s.start_time.minutes() < candidate.end)
            .find(|s| Some(s.id) != exclude)
    }

    /// Create a slot, rejecting reversed windows and overlaps with existing slots.
    pub fn create(&mut self, new: NewSlot) -> Result<AvailabilitySlot> {
        let slot = AvailabilitySlot {
            id: SlotId::generate(),
            sitter_id: new.sitter_id,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            is_available: new.is_available,
            booking_id: None,
            slot_type: new.slot_type,
            custom_rate: new.custom_rate,
        };
        self.insert(slot.clone())?;
        Ok(slot)
    }

    /// Insert a fully formed slot (used when restoring a snapshot).
    pub fn insert(&mut self, slot: AvailabilitySlot) -> Result<()> {
        let window = TimeWindow::new(slot.start_time, slot.end_time)?;
        if self.locator.contains_key(&slot.id) {
            return Err(SchedulerError::Conflict(format!("slot {} already exists", slot.id)));
        }
        if let Some(existing) = self.find_overlap(&slot.sitter_id, slot.date, window) {
            return Err(overlap_error(&slot, existing));
        }

        self.locator
            .insert(slot.id, (slot.sitter_id.clone(), slot.date));
        let day = self
            .days
            .entry(slot.sitter_id.clone())
            .or_default()
            .entry(slot.date)
            .or_default();
        let at = day.partition_point(|s| s.start_time < slot.start_time);
        day.insert(at, slot);
        Ok(())
    }

    pub fn get(&self, id: SlotId) -> Option<&AvailabilitySlot> {
        let (sitter_id, date) = self.locator.get(&id)?;
        self.days
            .get(sitter_id)?
            .get(date)?
            .iter()
            .find(|s| s.id == id)
    }

    /// Update a slot owned by `sitter_id`. Time changes are re-checked for overlap
    /// and refused while a booking holds the slot.
    pub fn update(
        &mut self,
        sitter_id: &SitterId,
        id: SlotId,
        update: SlotUpdate,
    ) -> Result<AvailabilitySlot> {
        let current = self
            .owned(sitter_id, id)
            .ok_or_else(|| SchedulerError::not_found("slot", id))?
            .clone();

        let start = update.start_time.unwrap_or(current.start_time);
        let end = update.end_time.unwrap_or(current.end_time);
        let window = TimeWindow::new(start, end)?;
        if window != current.window() {
            if let Some(booking) = current.booking_id {
                return Err(SchedulerError::Conflict(format!(
                    "slot {} is held by booking {}; release it before changing its times",
                    id, booking
                )));
            }
            if let Some(existing) =
                self.find_overlap_excluding(sitter_id, current.date, window, Some(id))
            {
                return Err(overlap_error(&current, existing));
            }
        }

        let day = self.day_mut(sitter_id, current.date);
        let Some(slot) = day.iter_mut().find(|s| s.id == id) else {
            return Err(SchedulerError::not_found("slot", id));
        };
        slot.start_time = start;
        slot.end_time = end;
        if let Some(flag) = update.is_available {
            slot.is_available = flag;
        }
        if let Some(kind) = update.slot_type {
            slot.slot_type = kind;
        }
        if let Some(rate) = update.custom_rate {
            slot.custom_rate = Some(rate);
        }
        let updated = slot.clone();
        day.sort_by_key(|s| s.start_time);
        Ok(updated)
    }

    /// Delete a slot owned by `sitter_id`.
    pub fn delete(&mut self, sitter_id: &SitterId, id: SlotId) -> Result<AvailabilitySlot> {
        self.remove_owned(sitter_id, id)
            .ok_or_else(|| SchedulerError::not_found("slot", id))
    }

    /// Create each slot independently; failures are collected, not fatal.
    pub fn bulk_create(&mut self, items: Vec<NewSlot>) -> BatchOutcome<AvailabilitySlot, NewSlot> {
        let mut outcome = BatchOutcome::new();
        for item in items {
            match self.create(item.clone()) {
                Ok(slot) => outcome.succeeded.push(slot),
                Err(e) => {
                    tracing::warn!(
                        sitter = %item.sitter_id,
                        date = %item.date,
                        start = %item.start_time,
                        end = %item.end_time,
                        error = %e,
                        "skipping slot in bulk create"
                    );
                    outcome.push_failure(item, e);
                }
            }
        }
        outcome
    }

    /// Delete the given ids owned by `sitter_id`, returning how many were removed.
    ///
    /// Unknown or already-deleted ids contribute zero.
    pub fn bulk_delete(&mut self, sitter_id: &SitterId, ids: &[SlotId]) -> usize {
        ids.iter()
            .filter(|id| self.remove_owned(sitter_id, **id).is_some())
            .count()
    }

    /// All of a sitter's slots dated within `from..=to`, in date then start order.
    pub fn slots_in_range(
        &self,
        sitter_id: &SitterId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<&AvailabilitySlot> {
        if from > to {
            return Vec::new();
        }
        self.days
            .get(sitter_id)
            .map(|by_date| by_date.range(from..=to).flat_map(|(_, v)| v.iter()).collect())
            .unwrap_or_default()
    }

    /// Mark the open slot covering `window` on `date` as consumed by `booking_id`.
    ///
    /// Returns the consumed slot's id, or `None` if no open slot covers the window.
    pub fn consume(
        &mut self,
        sitter_id: &SitterId,
        date: NaiveDate,
        window: TimeWindow,
        booking_id: BookingId,
    ) -> Option<SlotId> {
        let slot = self
            .days
            .get_mut(sitter_id)?
            .get_mut(&date)?
            .iter_mut()
            .find(|s| s.is_open() && s.window().contains(window))?;
        slot.booking_id = Some(booking_id);
        slot.is_available = false;
        Some(slot.id)
    }

    /// Return slots consumed by `booking_id` to the open pool.
    pub fn release(&mut self, booking_id: BookingId) -> usize {
        let mut released = 0;
        for slot in self
            .days
            .values_mut()
            .flat_map(|by_date| by_date.values_mut())
            .flat_map(|v| v.iter_mut())
            .filter(|s| s.booking_id == Some(booking_id))
        {
            slot.booking_id = None;
            slot.is_available = true;
            released += 1;
        }
        released
    }

    pub fn iter(&self) -> impl Iterator<Item = &AvailabilitySlot> {
        self.days
            .values()
            .flat_map(|by_date| by_date.values())
            .flat_map(|v| v.iter())
    }

    fn owned(&self, sitter_id: &SitterId, id: SlotId) -> Option<&AvailabilitySlot> {
        self.get(id).filter(|s| &s.sitter_id == sitter_id)
    }

    fn remove_owned(&mut self, sitter_id: &SitterId, id: SlotId) -> Option<AvailabilitySlot> {
        let date = self.owned(sitter_id, id)?.date;
        self.locator.remove(&id);
        let by_date = self.days.get_mut(sitter_id)?;
        let day = by_date.get_mut(&date)?;
        let pos = day.iter().position(|s| s.id == id)?;
        let removed = day.remove(pos);
        if day.is_empty() {
            by_date.remove(&date);
        }
        Some(removed)
    }

    fn day_mut(&mut self, sitter_id: &SitterId, date: NaiveDate) -> &mut Vec<AvailabilitySlot> {
        self.days
            .entry(sitter_id.clone())
            .or_default()
            .entry(date)
            .or_default()
    }
}

fn overlap_error(candidate: &AvailabilitySlot, existing: &AvailabilitySlot) -> SchedulerError {
    SchedulerError::Conflict(format!(
        "slot {}-{} on {} overlaps existing slot {}-{}",
        candidate.start_time, candidate.end_time, candidate.date, existing.start_time, existing.end_time
    ))
}
