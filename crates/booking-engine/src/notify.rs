//! Fire-and-forget notifications about admitted bookings.
//!
//! Delivery failures are reported back to the scheduler, which logs and
//! drops them. An admission that already happened is never undone.

use thiserror::Error;

use crate::booking::Booking;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

pub trait Notifier: Send + Sync {
    /// Called once per admitted request with the representative (first-day)
    /// booking and every sibling.
    fn booking_admitted(&self, representative: &Booking, all: &[Booking]) -> Result<(), NotifyError>;
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn booking_admitted(&self, _representative: &Booking, _all: &[Booking]) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes each admission to the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn booking_admitted(&self, representative: &Booking, all: &[Booking]) -> Result<(), NotifyError> {
        tracing::info!(
            booking = %representative.id,
            client = %representative.client_id,
            days = all.len(),
            start = %representative.start,
            "booking admitted"
        );
        Ok(())
    }
}
