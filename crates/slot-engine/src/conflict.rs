//! Detect events that collide with candidate slots.
//!
//! Two detectors live here and answer different questions:
//!
//! - [`conflicts_with_buffer`] is the strict generation-time rule. An event blocks every
//!   slot up to the clock hour that follows its end plus a buffer.
//! - [`find_conflicts`] is the plain overlap check used for ad hoc collision warnings
//!   when a user proposes an event against already offered slots.
//!
//! Adjacent intervals (one ends exactly when another starts) are NOT conflicts under
//! either rule.

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::slot::{ScheduledEvent, TimeSlot};

/// A detected overlap between a proposed slot and an existing event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub slot: TimeSlot,
    pub event: ScheduledEvent,
    pub overlap_minutes: i64,
}

/// Find every `(event, slot)` pair whose time ranges overlap.
///
/// An event conflicts with a slot when `event.start < slot.end && event.end > slot.start`.
/// No buffer is applied. Results are ordered by event, then by slot.
pub fn find_conflicts(slots: &[TimeSlot], events: &[ScheduledEvent]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for event in events {
        for slot in slots {
            if event.start < slot.end() && event.end > slot.start() {
                let overlap_start = event.start.max(slot.start());
                let overlap_end = event.end.min(slot.end());
                conflicts.push(Conflict {
                    slot: *slot,
                    event: event.clone(),
                    overlap_minutes: (overlap_end - overlap_start).num_minutes(),
                });
            }
        }
    }

    conflicts
}

/// End of the blocked interval for an event under the buffered rule.
///
/// The buffer is added to the event's end, then the result is moved to the start of
/// the *next* wall-clock hour in `tz`, even when it already sits on an hour boundary:
///
/// - `11:30` + 20 min = `11:50` → `12:00`
/// - `11:40` + 20 min = `12:00` → `13:00`
pub fn buffered_end(end: DateTime<Utc>, buffer: Duration, tz: &Tz) -> DateTime<Utc> {
    let buffered = end + buffer;
    let local = buffered.with_timezone(tz);
    let into_hour = Duration::minutes(i64::from(local.minute()))
        + Duration::seconds(i64::from(local.second()))
        + Duration::nanoseconds(i64::from(local.nanosecond()));
    buffered - into_hour + Duration::hours(1)
}

/// Generation-time conflict test: does `event`, extended by the buffer and rounded up
/// to the next hour, overlap `slot`?
///
/// The blocked interval is `[event.start, buffered_end)` and the test is half-open:
/// `event.start < slot.end && slot.start < buffered_end`.
pub fn conflicts_with_buffer(
    event: &ScheduledEvent,
    slot: &TimeSlot,
    buffer: Duration,
    tz: &Tz,
) -> bool {
    slot.overlaps(event.start, buffered_end(event.end, buffer, tz))
}
