//! Engine configuration: timezone, conflict buffer and weekday rules.

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::rules::WeeklyRules;

/// Minutes added after an event's end before it stops blocking slots.
pub const DEFAULT_BUFFER_MINUTES: i64 = 20;

/// Largest accepted buffer: one day.
pub const MAX_BUFFER_MINUTES: i64 = 24 * 60;

/// Tunables for [`AvailabilityEngine`](crate::availability::AvailabilityEngine).
///
/// Every field has a default, so an empty TOML table is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA timezone in which slot windows and hour rounding are evaluated.
    pub timezone: Tz,
    /// Buffer after each event before the next hour boundary is taken.
    pub buffer_minutes: i64,
    pub rules: WeeklyRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            rules: WeeklyRules::default(),
        }
    }
}

impl EngineConfig {
    /// Default configuration in the named IANA timezone.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidTimezone` if `timezone` is not a known IANA identifier.
    pub fn with_timezone(timezone: &str) -> Result<Self> {
        Ok(Self {
            timezone: parse_timezone(timezone)?,
            ..Self::default()
        })
    }

    /// The buffer as a duration, clamped to `0..=MAX_BUFFER_MINUTES`.
    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.buffer_minutes.clamp(0, MAX_BUFFER_MINUTES))
    }

    /// Check the invariants that deserialization alone cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_BUFFER_MINUTES).contains(&self.buffer_minutes) {
            return Err(EngineError::InvalidRule(format!(
                "buffer_minutes must be between 0 and {MAX_BUFFER_MINUTES}, got {}",
                self.buffer_minutes
            )));
        }
        self.rules.validate()
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(name.to_string()))
}
