//! Tests for range expansion: day counts, default times, DST-aware instants.

use booking_engine::{
    BookingRequest, ClientId, ClockTime, EngineConfig, RangeExpander, SchedulerError,
    ServiceDetails,
};
use chrono::{NaiveDate, TimeZone, Utc};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn clock(text: &str) -> ClockTime {
    text.parse().unwrap()
}

fn request(start: NaiveDate, end: NaiveDate, times: Option<(&str, &str)>) -> BookingRequest {
    BookingRequest {
        client_id: ClientId::new("client-1"),
        sitter_id: None,
        start_date: start,
        end_date: end,
        start_time: times.map(|(s, _)| s.to_string()),
        end_time: times.map(|(_, e)| e.to_string()),
        service: ServiceDetails {
            service_type: "dog_walking".to_string(),
            pet_count: 1,
            ..Default::default()
        },
        daily_rate: None,
    }
}

// ── Day counts ──────────────────────────────────────────────────────────────

#[test]
fn single_day_range_yields_one_draft() {
    let config = EngineConfig::default();
    let drafts = RangeExpander::new(&config)
        .expand(&request(date(2024, 6, 1), date(2024, 6, 1), None))
        .unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].interval.date, date(2024, 6, 1));
}

#[test]
fn week_range_yields_seven_consecutive_days() {
    let config = EngineConfig::default();
    let drafts = RangeExpander::new(&config)
        .expand(&request(date(2024, 6, 1), date(2024, 6, 7), Some(("10:00", "11:00"))))
        .unwrap();
    assert_eq!(drafts.len(), 7);
    for (i, draft) in drafts.iter().enumerate() {
        assert_eq!(draft.interval.date, date(2024, 6, 1 + i as u32));
        assert_eq!(draft.amount, 4600);
        assert_eq!(draft.service.service_type, "dog_walking");
    }
}

#[test]
fn range_crossing_month_end() {
    let config = EngineConfig::default();
    let dates = RangeExpander::new(&config)
        .dates(date(2024, 2, 28), date(2024, 3, 1))
        .unwrap();
    assert_eq!(dates, vec![date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]);
}

#[test]
fn reversed_range_is_a_validation_error() {
    let config = EngineConfig::default();
    let result = RangeExpander::new(&config)
        .expand(&request(date(2024, 6, 3), date(2024, 6, 1), None));
    assert!(matches!(result, Err(SchedulerError::Validation(_))));
}

#[test]
fn range_longer_than_limit_is_rejected() {
    let config = EngineConfig::default();
    let expander = RangeExpander::new(&config);
    assert_eq!(expander.day_count(date(2024, 1, 1), date(2024, 12, 31)).unwrap(), 366);
    assert!(expander.day_count(date(2024, 1, 1), date(2025, 1, 1)).is_err());

    let tight = EngineConfig {
        max_range_days: 3,
        ..EngineConfig::default()
    };
    assert!(RangeExpander::new(&tight)
        .day_count(date(2024, 6, 1), date(2024, 6, 4))
        .is_err());
}

// ── Times ───────────────────────────────────────────────────────────────────

#[test]
fn missing_times_use_configured_defaults() {
    let config = EngineConfig::default();
    let times = RangeExpander::new(&config).resolve_times(None, None);
    assert_eq!(times.start, clock("09:00"));
    assert_eq!(times.end, clock("17:00"));
    assert!(!times.stretched);
}

#[test]
fn unparseable_times_fall_back_to_defaults() {
    let config = EngineConfig::default();
    let times = RangeExpander::new(&config).resolve_times(Some("after lunch"), Some("5 PM"));
    assert_eq!(times.start, clock("09:00"));
    assert_eq!(times.end, clock("17:00"));
}

#[test]
fn end_not_after_start_stretches_to_minimum_window() {
    let config = EngineConfig::default();
    let expander = RangeExpander::new(&config);

    let times = expander.resolve_times(Some("14:00"), Some("2 PM"));
    assert!(times.stretched);
    assert_eq!(times.end, clock("15:00"));

    let intervals = expander
        .intervals(date(2024, 6, 3), date(2024, 6, 3), Some("15:00"), Some("10:00"))
        .unwrap();
    let day = &intervals[0];
    assert_eq!(day.end - day.start, chrono::Duration::minutes(60));
    assert_eq!(day.window.end - day.window.start, 60);
}

#[test]
fn stretched_window_may_cross_midnight() {
    let config = EngineConfig::default();
    let intervals = RangeExpander::new(&config)
        .intervals(date(2024, 6, 3), date(2024, 6, 3), Some("23:30"), Some("23:00"))
        .unwrap();
    let day = &intervals[0];
    // 23:30 EDT is 03:30Z the next day; the window runs an hour past that.
    assert_eq!(day.start, Utc.with_ymd_and_hms(2024, 6, 4, 3, 30, 0).unwrap());
    assert_eq!(day.end, Utc.with_ymd_and_hms(2024, 6, 4, 4, 30, 0).unwrap());
    assert_eq!(day.window.end, 24 * 60 + 30);
}

#[test]
fn longest_stretch_never_reaches_the_next_day() {
    let config = EngineConfig {
        min_window_minutes: 1439,
        ..EngineConfig::default()
    };
    let intervals = RangeExpander::new(&config)
        .intervals(date(2024, 6, 3), date(2024, 6, 5), Some("10:00"), Some("09:00"))
        .unwrap();
    assert_eq!(intervals.len(), 3);
    for pair in intervals.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
    assert_eq!(
        intervals[0].end,
        Utc.with_ymd_and_hms(2024, 6, 4, 13, 59, 0).unwrap()
    );
}

// ── Instants ────────────────────────────────────────────────────────────────

#[test]
fn three_day_summer_request_lands_on_edt_instants() {
    let config = EngineConfig::default();
    let drafts = RangeExpander::new(&config)
        .expand(&request(date(2024, 6, 1), date(2024, 6, 3), Some(("09:00", "17:00"))))
        .unwrap();
    for (i, draft) in drafts.iter().enumerate() {
        let day = 1 + i as u32;
        assert_eq!(draft.interval.start, Utc.with_ymd_and_hms(2024, 6, day, 13, 0, 0).unwrap());
        assert_eq!(draft.interval.end, Utc.with_ymd_and_hms(2024, 6, day, 21, 0, 0).unwrap());
    }
}

#[test]
fn each_day_is_resolved_against_its_own_offset() {
    // Toronto springs forward on 2024-03-10.
    let config = EngineConfig::default();
    let intervals = RangeExpander::new(&config)
        .intervals(date(2024, 3, 9), date(2024, 3, 11), Some("09:00"), Some("10:00"))
        .unwrap();
    let starts: Vec<_> = intervals.iter().map(|i| i.start).collect();
    assert_eq!(
        starts,
        vec![
            Utc.with_ymd_and_hms(2024, 3, 9, 14, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 10, 13, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 11, 13, 0, 0).unwrap(),
        ]
    );
}

#[test]
fn configured_timezone_is_used() {
    let config = EngineConfig {
        timezone: chrono_tz::Tz::America__Vancouver,
        ..EngineConfig::default()
    };
    let intervals = RangeExpander::new(&config)
        .intervals(date(2024, 6, 3), date(2024, 6, 3), Some("09:00"), Some("17:00"))
        .unwrap();
    assert_eq!(intervals[0].start, Utc.with_ymd_and_hms(2024, 6, 3, 16, 0, 0).unwrap());
}

#[test]
fn explicit_daily_rate_overrides_default() {
    let config = EngineConfig::default();
    let mut req = request(date(2024, 6, 3), date(2024, 6, 4), None);
    req.daily_rate = Some(5500);
    let drafts = RangeExpander::new(&config).expand(&req).unwrap();
    assert!(drafts.iter().all(|d| d.amount == 5500));
}
