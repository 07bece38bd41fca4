//! JSON snapshot of scheduler state, standing in for the persistence layer.

use serde::{Deserialize, Serialize};

use crate::admission::Scheduler;
use crate::booking::Booking;
use crate::config::EngineConfig;
use crate::directory::{InMemoryDirectory, SitterProfile};
use crate::error::{Result, SchedulerError};
use crate::notify::Notifier;
use crate::schedule::AvailabilitySettings;
use crate::slots::AvailabilitySlot;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub sitters: Vec<SitterProfile>,
    #[serde(default)]
    pub settings: Vec<AvailabilitySettings>,
    #[serde(default)]
    pub slots: Vec<AvailabilitySlot>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SchedulerError::Snapshot(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SchedulerError::Snapshot(e.to_string()))
    }

    /// Build a scheduler over this state, with the snapshot's sitters as the directory.
    ///
    /// Slots and settings go through the same validation as live writes, so an
    /// edited snapshot with overlapping slots is rejected.
    pub fn to_scheduler(
        &self,
        config: EngineConfig,
        notifier: impl Notifier + 'static,
    ) -> Result<Scheduler> {
        let directory = InMemoryDirectory::new(self.sitters.iter().cloned());
        let mut scheduler = Scheduler::new(config, directory, notifier);
        for settings in &self.settings {
            scheduler.restore_settings(settings.clone())?;
        }
        for slot in &self.slots {
            scheduler.restore_slot(slot.clone())?;
        }
        for booking in &self.bookings {
            scheduler.restore_booking(booking.clone())?;
        }
        Ok(scheduler)
    }

    /// Replace settings, slots and bookings with the scheduler's current state.
    pub fn refresh(&mut self, scheduler: &Scheduler) {
        let mut settings: Vec<AvailabilitySettings> =
            scheduler.stored_settings().cloned().collect();
        settings.sort_by(|a, b| a.sitter_id.cmp(&b.sitter_id));

        let mut slots: Vec<AvailabilitySlot> = scheduler.slots().iter().cloned().collect();
        slots.sort_by(|a, b| {
            (&a.sitter_id, a.date, a.start_time).cmp(&(&b.sitter_id, b.date, b.start_time))
        });

        self.settings = settings;
        self.slots = slots;
        self.bookings = scheduler
            .bookings()
            .iter_sorted()
            .into_iter()
            .cloned()
            .collect();
    }
}
