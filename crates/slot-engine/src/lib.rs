//! # slot-engine
//!
//! Deterministic free/busy slot generation for scheduling dashboards.
//!
//! Given an inclusive date range, a weekday rule set and the events already on the
//! calendar, the engine produces a per-day schedule of free candidate slots and busy
//! periods. Events block slots under a buffered rule: the event's end is extended by a
//! buffer and rounded up to the following clock hour before the overlap test.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use slot_engine::{compute_availability, DayStatus};
//!
//! let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
//! let sunday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
//! let snapshot = compute_availability(monday, sunday, &[]);
//!
//! let week = &snapshot.users[0].availability;
//! assert_eq!(week.len(), 7);
//! assert_eq!(week[5].status, DayStatus::Unavailable); // Saturday
//! assert_eq!(week[6].free_periods.len(), 2); // Sunday half day
//! ```
//!
//! ## Modules
//!
//! - [`availability`] — per-day schedules, single-user and group snapshots
//! - [`conflict`] — buffered generation-time rule and plain overlap detection
//! - [`freebusy`] — normalization and intersection of free periods
//! - [`rules`] — weekday candidate windows
//! - [`config`] — timezone, buffer and rule configuration
//! - [`export`] — CSV rendering of snapshots
//! - [`slot`] — `TimeSlot`, `BusyPeriod`, `ScheduledEvent`
//! - [`error`] — Error types

pub mod availability;
pub mod config;
pub mod conflict;
pub mod error;
pub mod export;
pub mod freebusy;
pub mod rules;
pub mod slot;

pub use availability::{
    compute_availability, AvailabilityEngine, AvailabilitySnapshot, AvailabilitySummary,
    DateRange, DayAvailability, DayStatus, UserAvailability, UserProfile, UserSchedule,
};
pub use config::EngineConfig;
pub use conflict::{conflicts_with_buffer, find_conflicts, Conflict};
pub use error::EngineError;
pub use export::export_csv;
pub use slot::{BusyPeriod, ScheduledEvent, TimeSlot};
