//! Property-based tests for time parsing, overlap detection, and range expansion.
//!
//! These check invariants that should hold for any valid input, not just the
//! fixed cases in the other test files.

use booking_engine::freebusy::find_open_windows;
use booking_engine::slots::SlotStore;
use booking_engine::time::{format_minutes, try_parse_time};
use booking_engine::{
    overlaps, Booking, BookingId, BookingStatus, ClientId, ClockTime, EngineConfig, NewSlot,
    RangeExpander, ServiceDetails, SitterId, TimeWindow,
};
use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_minute_of_day() -> impl Strategy<Value = u32> {
    0u32..1440
}

fn arb_window() -> impl Strategy<Value = TimeWindow> {
    (0u32..1439)
        .prop_flat_map(|start| (Just(start), start + 1..=1439))
        .prop_map(|(start, end)| TimeWindow { start, end })
}

/// A start date in 2024-2026; the day is capped at 28 to keep every month valid.
fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2024i32..=2026, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn arb_status() -> impl Strategy<Value = BookingStatus> {
    prop_oneof![
        Just(BookingStatus::Pending),
        Just(BookingStatus::Confirmed),
        Just(BookingStatus::InProgress),
        Just(BookingStatus::Completed),
        Just(BookingStatus::Cancelled),
    ]
}

fn arb_timezone() -> impl Strategy<Value = chrono_tz::Tz> {
    prop_oneof![
        Just(chrono_tz::Tz::America__Toronto),
        Just(chrono_tz::Tz::America__Vancouver),
        Just(chrono_tz::Tz::Europe__London),
        Just(chrono_tz::Tz::UTC),
    ]
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

fn clock(minutes: u32) -> ClockTime {
    ClockTime::from_minutes(minutes).unwrap()
}

fn held_booking(start: DateTime<Utc>, end: DateTime<Utc>, status: BookingStatus) -> Booking {
    Booking {
        id: BookingId::generate(),
        client_id: ClientId::new("C"),
        sitter_id: Some(SitterId::new("S")),
        start,
        end,
        status,
        total_amount: 4600,
        service: ServiceDetails::default(),
        created_at: start,
    }
}

// ---------------------------------------------------------------------------
// Property 1: HH:mm formatting parses back to the same minute
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn formatted_time_parses_back(minutes in arb_minute_of_day()) {
        let text = format_minutes(minutes);
        prop_assert_eq!(text.len(), 5);
        prop_assert_eq!(try_parse_time(&text), Some(minutes));
    }
}

// ---------------------------------------------------------------------------
// Property 2: Overlap is symmetric and touching windows never overlap
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn overlap_is_symmetric(a in arb_window(), b in arb_window()) {
        prop_assert_eq!(overlaps(a, b), overlaps(b, a));
        prop_assert!(overlaps(a, a));
        if a.end == b.start || b.end == a.start {
            prop_assert!(!overlaps(a, b));
        }
    }
}

// ---------------------------------------------------------------------------
// Property 3: The slot store never holds two overlapping slots on one day
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn store_rejects_every_overlap(windows in prop::collection::vec(arb_window(), 1..30)) {
        let mut store = SlotStore::new();
        let sitter = SitterId::new("S");
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        for w in &windows {
            let _ = store.create(NewSlot::new(sitter.clone(), day, clock(w.start), clock(w.end)));
        }

        let stored = store.slots_in_range(&sitter, day, day);
        prop_assert!(!stored.is_empty());
        for pair in stored.windows(2) {
            prop_assert!(
                pair[0].window().end <= pair[1].window().start,
                "slots {:?} and {:?} overlap",
                pair[0].window(),
                pair[1].window()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Property 4: Expansion yields one interval per calendar day, in order
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn expansion_covers_every_day(
        start in arb_date(),
        extra_days in 0u64..40,
        tz in arb_timezone(),
        window in arb_window(),
    ) {
        let config = EngineConfig { timezone: tz, ..EngineConfig::default() };
        let end = start.checked_add_days(Days::new(extra_days)).unwrap();
        let start_text = format_minutes(window.start);
        let end_text = format_minutes(window.end);

        let intervals = RangeExpander::new(&config)
            .intervals(start, end, Some(&start_text), Some(&end_text))
            .unwrap();

        prop_assert_eq!(intervals.len() as u64, extra_days + 1);
        for (i, interval) in intervals.iter().enumerate() {
            prop_assert_eq!(interval.date, start.checked_add_days(Days::new(i as u64)).unwrap());
            prop_assert!(interval.start < interval.end);
        }
        for pair in intervals.windows(2) {
            prop_assert!(pair[0].start < pair[1].start);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 5: Open windows stay inside the working window and avoid busy time
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn open_windows_avoid_busy_time(
        busy in prop::collection::vec((0i64..600, 1i64..120, arb_status()), 0..10),
    ) {
        let window_start = Utc.with_ymd_and_hms(2024, 6, 3, 13, 0, 0).unwrap();
        let window_end = window_start + Duration::hours(8);
        let bookings: Vec<Booking> = busy
            .into_iter()
            .map(|(offset, len, status)| {
                let start = window_start - Duration::minutes(60) + Duration::minutes(offset);
                held_booking(start, start + Duration::minutes(len), status)
            })
            .collect();
        let refs: Vec<&Booking> = bookings.iter().collect();

        let open = find_open_windows(&refs, window_start, window_end);
        for w in &open {
            prop_assert!(window_start <= w.start && w.end <= window_end);
            prop_assert!(w.duration_minutes > 0);
            for b in bookings.iter().filter(|b| b.status.is_active()) {
                prop_assert!(!b.intersects(w.start, w.end), "open window intersects a held booking");
            }
        }
        for pair in open.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }

        // Cancelled and completed days hold nothing.
        if bookings.iter().all(|b| !b.status.is_active()) {
            prop_assert_eq!(open.len(), 1);
            prop_assert_eq!(open[0].duration_minutes, 480);
        }
    }
}
