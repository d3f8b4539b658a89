use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use slot_engine::{AvailabilityEngine, ScheduledEvent, UserProfile, UserSchedule};
use std::hint::black_box;

/// Four one-hour meetings per day for 31 days starting 2024-06-01.
fn month_of_events() -> Vec<ScheduledEvent> {
    let first = Utc.with_ymd_and_hms(2024, 6, 1, 8, 15, 0).unwrap();
    (0..31)
        .flat_map(|day| {
            (0..4).map(move |n| {
                let start = first + Duration::days(day) + Duration::minutes(150 * n);
                ScheduledEvent::new(start, start + Duration::hours(1))
            })
        })
        .collect()
}

fn bench_single_user(c: &mut Criterion) {
    let engine = AvailabilityEngine::new();
    let events = month_of_events();
    let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

    c.bench_function("compute_availability/month", |b| {
        b.iter(|| engine.compute_availability(black_box(start), black_box(end), black_box(&events)))
    });
}

fn bench_group(c: &mut Criterion) {
    let engine = AvailabilityEngine::new();
    let events = month_of_events();
    let users: Vec<UserSchedule> = (0..8)
        .map(|n| UserSchedule {
            user_id: format!("user-{n}"),
            profile: UserProfile::default(),
            events: events.iter().skip(n).step_by(3).cloned().collect(),
        })
        .collect();
    let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

    c.bench_function("compute_group_availability/8-users", |b| {
        b.iter(|| engine.compute_group_availability(black_box(start), black_box(end), black_box(&users)))
    });
}

criterion_group!(benches, bench_single_user, bench_group);
criterion_main!(benches);
