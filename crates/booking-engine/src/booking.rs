//! Daily booking records and the per-sitter conflict index.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SchedulerError};
use crate::types::{BookingId, ClientId, SitterId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Statuses that occupy the assigned sitter's time.
    pub const ACTIVE: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Assigned,
        BookingStatus::InProgress,
    ];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed | Assigned | Cancelled)
                | (Confirmed, Assigned | InProgress | Cancelled)
                | (Assigned, InProgress | Cancelled)
                | (InProgress, Completed | Cancelled)
        )
    }
}

/// What the client asked for; copied onto every day of a multi-day request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceDetails {
    pub service_type: String,
    pub pet_count: u8,
    #[serde(default)]
    pub pet_types: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One calendar day of committed service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub client_id: ClientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitter_id: Option<SitterId>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    /// Amount for this single day, in cents.
    pub total_amount: u64,
    #[serde(flatten)]
    pub service: ServiceDetails,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Half-open overlap with `[start, end)`.
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }

    /// True when this booking holds `sitter_id`'s time.
    pub fn occupies(&self, sitter_id: &SitterId) -> bool {
        self.status.is_active() && self.sitter_id.as_ref() == Some(sitter_id)
    }
}

/// In-memory booking storage.
///
/// `by_sitter` is the explicit (sitter, start) index used for conflict
/// detection; only bookings with a sitter appear in it.
#[derive(Debug, Default)]
pub struct BookingStore {
    records: HashMap<BookingId, Booking>,
    by_sitter: HashMap<SitterId, BTreeSet<(DateTime<Utc>, BookingId)>>,
}

impl BookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: BookingId) -> Option<&Booking> {
        self.records.get(&id)
    }

    /// All bookings ordered by start instant.
    pub fn iter_sorted(&self) -> Vec<&Booking> {
        let mut all: Vec<&Booking> = self.records.values().collect();
        all.sort_by_key(|b| (b.start, b.id));
        all
    }

    pub fn insert(&mut self, booking: Booking) -> Result<()> {
        if self.records.contains_key(&booking.id) {
            return Err(SchedulerError::Conflict(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        if let Some(sitter_id) = &booking.sitter_id {
            self.by_sitter
                .entry(sitter_id.clone())
                .or_default()
                .insert((booking.start, booking.id));
        }
        self.records.insert(booking.id, booking);
        Ok(())
    }

    /// Active bookings intersecting `[start, end)`.
    ///
    /// With a sitter, only that sitter's bookings are considered; without
    /// one, every active booking is. `exclude` skips a single booking, for
    /// re-checking a booking against everything but itself.
    pub fn conflicts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sitter_id: Option<&SitterId>,
        exclude: Option<BookingId>,
    ) -> Vec<&Booking> {
        let candidates: Vec<&Booking> = match sitter_id {
            Some(sitter_id) => self.sitter_bookings_starting_before(sitter_id, end),
            None => self.records.values().collect(),
        };
        let mut hits: Vec<&Booking> = candidates
            .into_iter()
            .filter(|b| b.status.is_active())
            .filter(|b| Some(b.id) != exclude)
            .filter(|b| b.intersects(start, end))
            .collect();
        hits.sort_by_key(|b| (b.start, b.id));
        hits
    }

    /// Active bookings held by `sitter_id` intersecting `[start, end)`.
    pub fn active_for_sitter(
        &self,
        sitter_id: &SitterId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<&Booking> {
        self.conflicts(start, end, Some(sitter_id), None)
    }

    /// Move a booking to `status`, enforcing the lifecycle.
    pub fn set_status(&mut self, id: BookingId, status: BookingStatus) -> Result<&Booking> {
        let booking = self
            .records
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::not_found("booking", id))?;
        if !booking.status.can_transition_to(status) {
            return Err(SchedulerError::Validation(format!(
                "booking {} cannot move from {:?} to {:?}",
                id, booking.status, status
            )));
        }
        booking.status = status;
        Ok(booking)
    }

    /// Point a booking at `sitter_id`, keeping the index in step.
    pub fn assign(&mut self, id: BookingId, sitter_id: SitterId) -> Result<&Booking> {
        let booking = self
            .records
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::not_found("booking", id))?;
        if let Some(previous) = booking.sitter_id.take() {
            if let Some(index) = self.by_sitter.get_mut(&previous) {
                index.remove(&(booking.start, id));
            }
        }
        self.by_sitter
            .entry(sitter_id.clone())
            .or_default()
            .insert((booking.start, id));
        booking.sitter_id = Some(sitter_id);
        Ok(booking)
    }

    fn sitter_bookings_starting_before(
        &self,
        sitter_id: &SitterId,
        end: DateTime<Utc>,
    ) -> Vec<&Booking> {
        let Some(index) = self.by_sitter.get(sitter_id) else {
            return Vec::new();
        };
        index
            .range(..(end, BookingId(Uuid::nil())))
            .filter_map(|(_, id)| self.records.get(id))
            .collect()
    }
}
