//! Thread-safe handle around a [`Scheduler`].
//!
//! One mutex guards all scheduler state. A booking's conflict check and its
//! insert run under the same guard, so two concurrent requests for the same
//! sitter and interval cannot both be admitted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::admission::{Admission, AvailabilityQuery, AvailabilityReport, Scheduler};
use crate::error::Result;
use crate::expander::BookingRequest;

#[derive(Debug, Clone)]
pub struct SharedScheduler {
    inner: Arc<Mutex<Scheduler>>,
}

impl SharedScheduler {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            inner: Arc::new(Mutex::new(scheduler)),
        }
    }

    /// Check and admit under a single lock acquisition.
    pub fn create_booking(&self, request: BookingRequest, now: DateTime<Utc>) -> Result<Admission> {
        self.lock().create_booking(request, now)
    }

    pub fn check_availability(
        &self,
        query: &AvailabilityQuery,
        now: DateTime<Utc>,
    ) -> Result<AvailabilityReport> {
        self.lock().check_availability(query, now)
    }

    /// Run `f` with exclusive access to the scheduler.
    pub fn with<R>(&self, f: impl FnOnce(&mut Scheduler) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Scheduler> {
        // Poisoning only records that another caller panicked; keep serving.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
