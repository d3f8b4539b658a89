//! Tests for CSV export of availability snapshots.

use chrono::NaiveDate;
use chrono_tz::Tz;
use slot_engine::{compute_availability, export_csv, ScheduledEvent};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn header_and_one_row_per_user_day() {
    let snapshot = compute_availability(date(2024, 6, 7), date(2024, 6, 9), &[]);
    let csv = export_csv(&snapshot, &Tz::UTC);
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "User,Date,Status,Free Time Slots,Busy Time Slots");
    assert_eq!(
        lines[1],
        "Current User,2024-06-07,Available,09:00-11:00; 12:00-14:00; 15:00-17:00,"
    );
    assert_eq!(lines[2], "Current User,2024-06-08,Unavailable,,");
    assert_eq!(
        lines[3],
        "Current User,2024-06-09,Available,09:00-11:00; 12:00-14:00,"
    );
}

#[test]
fn busy_periods_are_listed() {
    let events = vec![ScheduledEvent::new(
        "2024-06-03T10:00:00Z".parse().unwrap(),
        "2024-06-03T11:30:00Z".parse().unwrap(),
    )];
    let snapshot = compute_availability(date(2024, 6, 3), date(2024, 6, 3), &events);
    let csv = export_csv(&snapshot, &Tz::UTC);

    assert!(csv.ends_with("Current User,2024-06-03,Available,12:00-14:00; 15:00-17:00,10:00-11:30\n"));
}

#[test]
fn times_render_in_viewer_timezone() {
    let snapshot = compute_availability(date(2024, 6, 9), date(2024, 6, 9), &[]);
    let tokyo: Tz = "Asia/Tokyo".parse().unwrap();

    let csv = export_csv(&snapshot, &tokyo);

    // UTC 09:00 is 18:00 in Tokyo.
    assert!(csv.contains("18:00-20:00; 21:00-23:00"));
}
