//! Tests for per-day availability computation.

use chrono::{NaiveDate, TimeZone, Utc};
use slot_engine::availability::{AvailabilityEngine, DayStatus, UserProfile, UserSchedule};
use slot_engine::config::EngineConfig;
use slot_engine::rules::{SlotWindow, WeeklyRules};
use slot_engine::{compute_availability, ScheduledEvent};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn event(start: &str, end: &str) -> ScheduledEvent {
    ScheduledEvent::new(start.parse().unwrap(), end.parse().unwrap())
}

fn hours(slots: &[slot_engine::TimeSlot]) -> Vec<(u32, u32)> {
    use chrono::Timelike;
    slots
        .iter()
        .map(|s| (s.start().hour(), s.end().hour()))
        .collect()
}

fn user(id: &str, events: Vec<ScheduledEvent>) -> UserSchedule {
    UserSchedule {
        user_id: id.to_string(),
        profile: UserProfile {
            name: id.to_uppercase(),
            email: None,
        },
        events,
    }
}

// ── Test 1: Empty week follows the weekday rules ────────────────────────────

#[test]
fn empty_week_follows_weekday_rules() {
    let snapshot = compute_availability(date(2024, 6, 3), date(2024, 6, 9), &[]);

    assert_eq!(snapshot.users.len(), 1);
    let week = &snapshot.users[0].availability;
    assert_eq!(week.len(), 7);

    // Monday through Friday: three free periods each.
    for day in &week[0..5] {
        assert_eq!(day.status, DayStatus::Available, "{}", day.date);
        assert_eq!(hours(&day.free_periods), vec![(9, 11), (12, 14), (15, 17)]);
    }

    // Saturday 2024-06-08 is excluded entirely.
    assert_eq!(week[5].date, date(2024, 6, 8));
    assert_eq!(week[5].status, DayStatus::Unavailable);
    assert!(week[5].free_periods.is_empty());
    assert!(week[5].busy_periods.is_empty());

    // Sunday 2024-06-09 is a half day.
    assert_eq!(week[6].date, date(2024, 6, 9));
    assert_eq!(week[6].status, DayStatus::Available);
    assert_eq!(hours(&week[6].free_periods), vec![(9, 11), (12, 14)]);
}

// ── Test 2: Event ending 11:30 blocks only the first slot ───────────────────

#[test]
fn morning_event_blocks_only_first_slot() {
    let events = vec![event("2024-06-03T10:00:00Z", "2024-06-03T11:30:00Z")];
    let snapshot = compute_availability(date(2024, 6, 3), date(2024, 6, 3), &events);

    let monday = &snapshot.users[0].availability[0];
    // Buffer end 11:50, rounded to 12:00: overlaps 09-11 but not 12-14.
    assert_eq!(hours(&monday.free_periods), vec![(12, 14), (15, 17)]);
    assert_eq!(monday.status, DayStatus::Available);
    assert_eq!(monday.busy_periods.len(), 1);
    assert_eq!(monday.busy_periods[0].event_title.as_deref(), Some("Busy"));
}

// ── Test 3: Event ending 11:40 also blocks the midday slot ──────────────────

#[test]
fn event_ending_1140_blocks_midday_slot() {
    let events = vec![event("2024-06-04T11:00:00Z", "2024-06-04T11:40:00Z")];
    let snapshot = compute_availability(date(2024, 6, 4), date(2024, 6, 4), &events);

    let tuesday = &snapshot.users[0].availability[0];
    // Buffer end 12:00, rounded to 13:00: blocks 09-11 and 12-14.
    assert_eq!(hours(&tuesday.free_periods), vec![(15, 17)]);
}

// ── Test 4: All slots blocked → Busy ────────────────────────────────────────

#[test]
fn fully_blocked_day_is_busy() {
    let events = vec![
        event("2024-06-05T08:00:00Z", "2024-06-05T17:00:00Z").with_title("Offsite"),
    ];
    let snapshot = compute_availability(date(2024, 6, 5), date(2024, 6, 5), &events);

    let day = &snapshot.users[0].availability[0];
    assert_eq!(day.status, DayStatus::Busy);
    assert!(day.free_periods.is_empty());
    assert_eq!(day.busy_periods[0].event_title.as_deref(), Some("Offsite"));
}

// ── Test 5: Events on other days are ignored ────────────────────────────────

#[test]
fn events_on_other_days_do_not_block() {
    let events = vec![event("2024-06-04T09:00:00Z", "2024-06-04T17:00:00Z")];
    let snapshot = compute_availability(date(2024, 6, 3), date(2024, 6, 3), &events);

    let monday = &snapshot.users[0].availability[0];
    assert_eq!(monday.free_periods.len(), 3);
    assert!(monday.busy_periods.is_empty());
}

// ── Test 6: Saturday events are not reported ────────────────────────────────

#[test]
fn saturday_ignores_events() {
    let events = vec![event("2024-06-08T10:00:00Z", "2024-06-08T12:00:00Z")];
    let snapshot = compute_availability(date(2024, 6, 8), date(2024, 6, 8), &events);

    let saturday = &snapshot.users[0].availability[0];
    assert_eq!(saturday.status, DayStatus::Unavailable);
    assert!(saturday.busy_periods.is_empty());
}

// ── Test 7: All-day flag is carried into busy periods ───────────────────────

#[test]
fn all_day_flag_is_preserved() {
    let events = vec![event("2024-06-06T00:00:00Z", "2024-06-07T00:00:00Z").all_day()];
    let snapshot = compute_availability(date(2024, 6, 6), date(2024, 6, 7), &events);

    let thursday = &snapshot.users[0].availability[0];
    assert!(thursday.busy_periods[0].is_all_day);
    assert_eq!(thursday.status, DayStatus::Busy);

    // Ends exactly at Friday midnight, so it does not belong to Friday.
    let friday = &snapshot.users[0].availability[1];
    assert!(friday.busy_periods.is_empty());
    assert_eq!(friday.free_periods.len(), 3);
}

// ── Test 8: Reversed range yields zero days ─────────────────────────────────

#[test]
fn reversed_range_yields_empty_snapshot() {
    let snapshot = compute_availability(date(2024, 6, 9), date(2024, 6, 3), &[]);

    assert_eq!(snapshot.summary.total_days, 0);
    assert!(snapshot.users[0].availability.is_empty());
}

// ── Test 9: Identical inputs give byte-identical output ─────────────────────

#[test]
fn computation_is_idempotent() {
    let events = vec![
        event("2024-06-03T10:00:00Z", "2024-06-03T11:30:00Z"),
        event("2024-06-05T14:00:00Z", "2024-06-05T15:10:00Z").with_title("Review"),
    ];

    let first = compute_availability(date(2024, 6, 3), date(2024, 6, 9), &events);
    let second = compute_availability(date(2024, 6, 3), date(2024, 6, 9), &events);

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

// ── Test 10: Slot windows follow the configured timezone ────────────────────

#[test]
fn windows_are_local_to_configured_timezone() {
    let engine =
        AvailabilityEngine::from_config(EngineConfig::with_timezone("America/New_York").unwrap())
            .unwrap();
    let day = engine.compute_day(date(2024, 6, 3), &[]);

    // EDT is UTC-4, so 09:00 local is 13:00 UTC.
    assert_eq!(
        day.free_periods[0].start(),
        Utc.with_ymd_and_hms(2024, 6, 3, 13, 0, 0).unwrap()
    );
}

// ── Test 11: Custom rules replace the defaults ──────────────────────────────

#[test]
fn custom_rules_are_applied() {
    let config = EngineConfig {
        rules: WeeklyRules {
            saturday: vec![SlotWindow::hours(10, 12)],
            sunday: Vec::new(),
            ..WeeklyRules::default()
        },
        ..EngineConfig::default()
    };
    let engine = AvailabilityEngine::from_config(config).unwrap();

    let snapshot = engine.compute_availability(date(2024, 6, 8), date(2024, 6, 9), &[]);
    let days = &snapshot.users[0].availability;
    assert_eq!(hours(&days[0].free_periods), vec![(10, 12)]);
    assert_eq!(days[1].status, DayStatus::Unavailable);
}

// ── Test 12: Single user leaves common slots empty ──────────────────────────

#[test]
fn single_user_has_no_common_slots() {
    let snapshot = compute_availability(date(2024, 6, 3), date(2024, 6, 4), &[]);

    assert_eq!(snapshot.summary.total_users, 1);
    assert_eq!(snapshot.summary.total_days, 2);
    assert!(snapshot.summary.common_free_slots.is_empty());
}

// ── Test 13: Group intersection across users ────────────────────────────────

#[test]
fn group_common_slots_are_intersection() {
    let engine = AvailabilityEngine::new();
    let users = vec![
        user("alice", vec![event("2024-06-03T09:00:00Z", "2024-06-03T10:00:00Z")]),
        user("bob", vec![event("2024-06-03T15:00:00Z", "2024-06-03T16:00:00Z")]),
    ];

    let snapshot = engine.compute_group_availability(date(2024, 6, 3), date(2024, 6, 3), &users);

    assert_eq!(snapshot.summary.total_users, 2);
    // Alice loses 09-11, Bob loses 15-17: only 12-14 is shared.
    assert_eq!(hours(&snapshot.summary.common_free_slots), vec![(12, 14)]);
}

// ── Test 14: Common slots skip days any user is unavailable ─────────────────

#[test]
fn group_common_slots_span_multiple_days() {
    let engine = AvailabilityEngine::new();
    let users = vec![user("alice", vec![]), user("bob", vec![])];

    // Friday, Saturday, Sunday.
    let snapshot = engine.compute_group_availability(date(2024, 6, 7), date(2024, 6, 9), &users);

    // Friday contributes 3, Saturday 0, Sunday 2.
    assert_eq!(snapshot.summary.common_free_slots.len(), 5);
}

// ── Test 15: Buffer must stay within one day ────────────────────────────────

#[test]
fn oversized_buffer_is_rejected() {
    let config: EngineConfig = toml::from_str("buffer_minutes = 9000000000000000").unwrap();
    assert!(matches!(
        AvailabilityEngine::from_config(config),
        Err(slot_engine::EngineError::InvalidRule(_))
    ));

    let day: EngineConfig = toml::from_str("buffer_minutes = 1440").unwrap();
    assert!(AvailabilityEngine::from_config(day).is_ok());
    let negative: EngineConfig = toml::from_str("buffer_minutes = -1").unwrap();
    assert!(AvailabilityEngine::from_config(negative).is_err());
}

#[test]
fn unvalidated_buffer_is_clamped() {
    let config = EngineConfig {
        buffer_minutes: i64::MAX,
        ..EngineConfig::default()
    };
    assert_eq!(config.buffer(), chrono::Duration::days(1));
}
