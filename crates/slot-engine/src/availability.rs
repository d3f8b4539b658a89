//! Per-day availability schedules built from weekday rules and existing events.
//!
//! For every day in an inclusive date range the engine lays out the candidate windows
//! from [`WeeklyRules`], drops every window blocked by an event under the buffered
//! rule ([`conflicts_with_buffer`]) and reports the survivors as free periods. The
//! day's events are reported independently as busy periods.
//!
//! Computation is pure and deterministic: identical inputs serialize to identical
//! output. There are no error states; a reversed range simply yields zero days.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::conflict::conflicts_with_buffer;
use crate::error::Result;
use crate::freebusy::intersect_free_periods;
use crate::slot::{local_day_bounds, resolve_local, BusyPeriod, ScheduledEvent, TimeSlot};

/// Identifier used when availability is computed for the caller's own calendar.
pub const CURRENT_USER_ID: &str = "current-user";

/// Derived state of a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    /// The weekday rule offers no windows at all.
    Unavailable,
    /// At least one candidate window survived conflict filtering.
    Available,
    /// Every candidate window is blocked.
    Busy,
}

impl DayStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DayStatus::Unavailable => "Unavailable",
            DayStatus::Available => "Available",
            DayStatus::Busy => "Busy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub free_periods: Vec<TimeSlot>,
    pub busy_periods: Vec<BusyPeriod>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAvailability {
    pub user_id: String,
    #[serde(default)]
    pub profile: UserProfile,
    pub availability: Vec<DayAvailability>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Every date in the inclusive range, empty when `start > end`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start
            .iter_days()
            .take_while(move |date| *date <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySummary {
    pub total_users: usize,
    pub total_days: usize,
    /// Periods free for every user. Only populated for groups of two or more.
    #[serde(default)]
    pub common_free_slots: Vec<TimeSlot>,
    pub date_range: DateRange,
}

/// Availability for one or more users over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySnapshot {
    pub users: Vec<UserAvailability>,
    pub summary: AvailabilitySummary,
}

/// One participant's input to a group computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSchedule {
    pub user_id: String,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub events: Vec<ScheduledEvent>,
}

/// Slot generator bound to a validated [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct AvailabilityEngine {
    config: EngineConfig,
}

impl AvailabilityEngine {
    /// Engine with the default rules evaluated in UTC.
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns `EngineError::InvalidRule` if the configured rules or buffer are invalid.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Candidate slots for `date` before any conflict filtering, in rule order.
    pub fn candidate_slots(&self, date: NaiveDate) -> Vec<TimeSlot> {
        let tz = &self.config.timezone;
        self.config
            .rules
            .windows_for(date.weekday())
            .iter()
            .filter_map(|window| {
                TimeSlot::new(
                    resolve_local(tz, date, window.start),
                    resolve_local(tz, date, window.end),
                )
                .ok()
            })
            .collect()
    }

    /// Compute a single day's schedule against `events`.
    ///
    /// Only events overlapping the local calendar day are considered. Each of them
    /// becomes a busy period whether or not it blocks a candidate window.
    pub fn compute_day(&self, date: NaiveDate, events: &[ScheduledEvent]) -> DayAvailability {
        if self.config.rules.excludes(date.weekday()) {
            return DayAvailability {
                date,
                status: DayStatus::Unavailable,
                free_periods: Vec::new(),
                busy_periods: Vec::new(),
            };
        }

        let tz = &self.config.timezone;
        let buffer = self.config.buffer();
        let (day_start, day_end) = local_day_bounds(tz, date);
        let day_events: Vec<&ScheduledEvent> = events
            .iter()
            .filter(|event| event.start < day_end && event.end > day_start)
            .collect();

        let free_periods: Vec<TimeSlot> = self
            .candidate_slots(date)
            .into_iter()
            .filter(|slot| {
                !day_events
                    .iter()
                    .any(|event| conflicts_with_buffer(event, slot, buffer, tz))
            })
            .collect();

        let busy_periods = day_events.iter().map(|event| BusyPeriod::from(*event)).collect();

        let status = if free_periods.is_empty() {
            DayStatus::Busy
        } else {
            DayStatus::Available
        };

        DayAvailability {
            date,
            status,
            free_periods,
            busy_periods,
        }
    }

    /// Availability of the caller's own calendar between `start` and `end` inclusive.
    pub fn compute_availability(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        events: &[ScheduledEvent],
    ) -> AvailabilitySnapshot {
        let user = UserSchedule {
            user_id: CURRENT_USER_ID.to_string(),
            profile: UserProfile {
                name: "Current User".to_string(),
                email: None,
            },
            events: events.to_vec(),
        };
        self.compute_group_availability(start, end, std::slice::from_ref(&user))
    }

    /// Availability of several users, plus the periods free for all of them.
    ///
    /// `common_free_slots` is the per-day intersection of every user's free periods.
    /// A single user (or none) leaves it empty.
    pub fn compute_group_availability(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        users: &[UserSchedule],
    ) -> AvailabilitySnapshot {
        let date_range = DateRange { start, end };
        let dates: Vec<NaiveDate> = date_range.days().collect();

        let users: Vec<UserAvailability> = users
            .iter()
            .map(|user| UserAvailability {
                user_id: user.user_id.clone(),
                profile: user.profile.clone(),
                availability: dates
                    .iter()
                    .map(|date| self.compute_day(*date, &user.events))
                    .collect(),
            })
            .collect();

        let common_free_slots = if users.len() >= 2 {
            common_free_slots(&users, dates.len())
        } else {
            Vec::new()
        };

        AvailabilitySnapshot {
            summary: AvailabilitySummary {
                total_users: users.len(),
                total_days: dates.len(),
                common_free_slots,
                date_range,
            },
            users,
        }
    }
}

/// Intersect users' free periods day by day. All users share the same date axis.
fn common_free_slots(users: &[UserAvailability], total_days: usize) -> Vec<TimeSlot> {
    (0..total_days)
        .flat_map(|day| {
            let per_user: Vec<&[TimeSlot]> = users
                .iter()
                .map(|user| user.availability[day].free_periods.as_slice())
                .collect();
            intersect_free_periods(&per_user)
        })
        .collect()
}

/// Compute availability with the default rules in UTC.
///
/// Convenience wrapper around [`AvailabilityEngine::compute_availability`].
pub fn compute_availability(
    start: NaiveDate,
    end: NaiveDate,
    events: &[ScheduledEvent],
) -> AvailabilitySnapshot {
    AvailabilityEngine::new().compute_availability(start, end, events)
}
