//! Day-of-week business rules: which wall-clock windows are offered as candidate slots.
//!
//! A weekday with no windows is excluded entirely and reported as `Unavailable`.
//! The default rule set offers three two-hour windows Monday–Friday, a half day on
//! Sunday and nothing on Saturday.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A wall-clock window `[start, end)` within a day, e.g. `09:00–11:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotWindow {
    #[serde(with = "hh_mm")]
    pub start: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end: NaiveTime,
}

impl SlotWindow {
    /// Build a window from whole hours.
    ///
    /// # Panics
    /// Panics if either hour is outside `0..24`.
    pub fn hours(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start_hour, 0, 0).expect("start hour in range"),
            end: NaiveTime::from_hms_opt(end_hour, 0, 0).expect("end hour in range"),
        }
    }
}

/// Candidate windows per weekday.
///
/// Missing fields in a deserialized rule set fall back to the defaults for that day,
/// so a config file only has to name the days it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyRules {
    pub monday: Vec<SlotWindow>,
    pub tuesday: Vec<SlotWindow>,
    pub wednesday: Vec<SlotWindow>,
    pub thursday: Vec<SlotWindow>,
    pub friday: Vec<SlotWindow>,
    pub saturday: Vec<SlotWindow>,
    pub sunday: Vec<SlotWindow>,
}

fn full_day() -> Vec<SlotWindow> {
    vec![
        SlotWindow::hours(9, 11),
        SlotWindow::hours(12, 14),
        SlotWindow::hours(15, 17),
    ]
}

fn half_day() -> Vec<SlotWindow> {
    vec![SlotWindow::hours(9, 11), SlotWindow::hours(12, 14)]
}

impl Default for WeeklyRules {
    fn default() -> Self {
        Self {
            monday: full_day(),
            tuesday: full_day(),
            wednesday: full_day(),
            thursday: full_day(),
            friday: full_day(),
            saturday: Vec::new(),
            sunday: half_day(),
        }
    }
}

impl WeeklyRules {
    /// The candidate windows for `weekday`, in declaration order.
    pub fn windows_for(&self, weekday: Weekday) -> &[SlotWindow] {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// True when the rule set offers no windows at all on `weekday`.
    pub fn excludes(&self, weekday: Weekday) -> bool {
        self.windows_for(weekday).is_empty()
    }

    /// Reject windows that are empty or inverted.
    pub fn validate(&self) -> Result<()> {
        const WEEK: [Weekday; 7] = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        for weekday in WEEK {
            for window in self.windows_for(weekday) {
                if window.start >= window.end {
                    return Err(EngineError::InvalidRule(format!(
                        "{weekday}: window {} is not before {}",
                        window.start.format("%H:%M"),
                        window.end.format("%H:%M"),
                    )));
                }
            }
        }
        Ok(())
    }
}

/// `HH:MM` serde representation for wall-clock times.
mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_exclude_only_saturday() {
        let rules = WeeklyRules::default();
        assert!(rules.excludes(Weekday::Sat));
        assert!(!rules.excludes(Weekday::Sun));
        assert_eq!(rules.windows_for(Weekday::Sun).len(), 2);
        assert_eq!(rules.windows_for(Weekday::Wed).len(), 3);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let rules = WeeklyRules {
            friday: vec![SlotWindow::hours(17, 15)],
            ..WeeklyRules::default()
        };
        assert!(matches!(rules.validate(), Err(EngineError::InvalidRule(_))));
    }
}
