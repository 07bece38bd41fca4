//! # booking-engine
//!
//! Scheduling and availability engine for sitter bookings.
//!
//! Models a sitter's recurring weekly hours, blackout dates and explicit
//! bookable slots, expands a client's multi-day request into independent
//! daily bookings with timezone-correct instants, and decides whether that
//! request can be admitted.
//!
//! ## Modules
//!
//! - [`time`] — Free-form time parsing, wall clock → UTC instant conversion
//! - [`dst`] — Handling of booking times inside DST gaps
//! - [`schedule`] — Weekly schedule, blackout dates, per-sitter settings
//! - [`slots`] — Slot store with same-day overlap detection
//! - [`booking`] — Daily booking records and the per-sitter conflict index
//! - [`expander`] — Date range → one interval per day
//! - [`admission`] — Booking creation, availability checks, sitter search
//! - [`freebusy`] — Open windows left in a working day after bookings
//! - [`shared`] — Mutex-guarded scheduler for concurrent callers
//! - [`snapshot`] — JSON snapshot of all scheduler state
//! - [`config`] — Engine configuration
//! - [`error`] — Error types

pub mod admission;
pub mod batch;
pub mod booking;
pub mod config;
pub mod directory;
pub mod dst;
pub mod error;
pub mod expander;
pub mod freebusy;
pub mod notify;
pub mod schedule;
pub mod shared;
pub mod slots;
pub mod snapshot;
pub mod time;
pub mod types;

pub use admission::{
    Admission, AvailabilityQuery, AvailabilityReport, ConflictReason, Scheduler, SitterSearch,
};
pub use batch::{BatchFailure, BatchOutcome};
pub use booking::{Booking, BookingStatus, ServiceDetails};
pub use config::EngineConfig;
pub use directory::{InMemoryDirectory, SitterDirectory, SitterProfile};
pub use dst::DstPolicy;
pub use error::SchedulerError;
pub use expander::{BookingRequest, DailyDraft, RangeExpander};
pub use notify::{LogNotifier, NoopNotifier, Notifier, NotifyError};
pub use schedule::{AvailabilitySettings, DaySchedule, SettingsUpdate, WeeklySchedule};
pub use shared::SharedScheduler;
pub use slots::{overlaps, AvailabilitySlot, NewSlot, SlotType, SlotUpdate, TimeWindow};
pub use snapshot::Snapshot;
pub use time::{local_to_instant, parse_time_to_minutes, try_parse_time, ClockTime};
pub use types::{BookingId, ClientId, SitterId, SlotId};
