//! Time slot primitives shared by slot generation, conflict detection and export.
//!
//! All instants are stored in UTC. Wall-clock rules (slot windows, hour rounding) are
//! resolved against a `chrono_tz::Tz` at the edges via [`resolve_local`].

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A half-open time interval `[start, end)` with `start < end`.
///
/// Constructed only through [`TimeSlot::new`] (or deserialization, which runs the same
/// check), so every value in circulation satisfies the ordering invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSlot")]
pub struct TimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawSlot> for TimeSlot {
    type Error = EngineError;

    fn try_from(raw: RawSlot) -> Result<Self> {
        TimeSlot::new(raw.start, raw.end)
    }
}

impl TimeSlot {
    /// Create a slot, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(EngineError::InvalidSlot {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Half-open overlap test against an arbitrary `[start, end)` interval.
    ///
    /// Adjacent intervals (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && self.start < end
    }

    /// Slot-to-slot intersection, `None` when the overlap is empty.
    pub fn intersection(&self, other: &TimeSlot) -> Option<TimeSlot> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeSlot { start, end })
    }
}

/// An existing calendar event as seen by the engine.
///
/// Only the time range matters for conflict detection; `title` and `all_day` are
/// carried through to the busy periods shown for the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub all_day: bool,
}

impl ScheduledEvent {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            title: None,
            all_day: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn all_day(mut self) -> Self {
        self.all_day = true;
        self
    }
}

/// Title shown for busy periods whose event carries none.
pub const DEFAULT_BUSY_TITLE: &str = "Busy";

/// An event occupying part of a day, as reported back to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub event_title: Option<String>,
    #[serde(default)]
    pub is_all_day: bool,
}

impl From<&ScheduledEvent> for BusyPeriod {
    fn from(event: &ScheduledEvent) -> Self {
        Self {
            start: event.start,
            end: event.end,
            event_title: Some(
                event
                    .title
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BUSY_TITLE.to_string()),
            ),
            is_all_day: event.all_day,
        }
    }
}

/// Resolve a wall-clock date and time in `tz` to a UTC instant.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times inside a
/// spring-forward gap shift forward by one hour, which lands on the first valid
/// wall-clock time after the gap for every zone with a one-hour transition.
pub fn resolve_local(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive: NaiveDateTime = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// UTC bounds of the local calendar day `date` in `tz`, as `[midnight, next midnight)`.
pub fn local_day_bounds(tz: &Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.succ_opt().unwrap_or(date);
    (
        resolve_local(tz, date, NaiveTime::MIN),
        resolve_local(tz, next, NaiveTime::MIN),
    )
}
