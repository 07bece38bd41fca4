//! Free stretches of a sitter's working window once their bookings are placed.
//!
//! Bookings are clipped to the window and walked in start order; anything the
//! walk has not yet covered when the next booking begins is open time.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::booking::Booking;

/// A free stretch of a sitter's working window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl OpenWindow {
    fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
        }
    }
}

/// Open windows within `[window_start, window_end)` left free by `bookings`.
///
/// Cancelled and completed bookings do not hold time and are ignored, as are
/// bookings outside the window. Back-to-back bookings leave no gap.
pub fn find_open_windows(
    bookings: &[&Booking],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<OpenWindow> {
    let mut open = Vec::new();
    if window_start >= window_end {
        return open;
    }

    let mut held: Vec<(DateTime<Utc>, DateTime<Utc>)> = bookings
        .iter()
        .filter(|b| b.status.is_active() && b.intersects(window_start, window_end))
        .map(|b| (b.start.max(window_start), b.end.min(window_end)))
        .collect();
    held.sort_unstable();

    let mut cursor = window_start;
    for (start, end) in held {
        if cursor < start {
            open.push(OpenWindow::between(cursor, start));
        }
        cursor = cursor.max(end);
    }
    if cursor < window_end {
        open.push(OpenWindow::between(cursor, window_end));
    }

    open
}
