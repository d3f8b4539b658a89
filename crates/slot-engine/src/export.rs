//! CSV export of an [`AvailabilitySnapshot`].
//!
//! One row per user-day with the columns
//! `User, Date, Status, Free Time Slots, Busy Time Slots`. Time ranges are rendered as
//! `HH:MM-HH:MM` in the viewer's timezone and joined with `"; "`.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::availability::{AvailabilitySnapshot, UserAvailability};

const HEADER: [&str; 5] = ["User", "Date", "Status", "Free Time Slots", "Busy Time Slots"];
const SLOT_SEPARATOR: &str = "; ";

/// Render `snapshot` as CSV text, newline-terminated rows, header first.
pub fn export_csv(snapshot: &AvailabilitySnapshot, viewer_tz: &Tz) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER.iter().map(|h| h.to_string()));

    for user in &snapshot.users {
        let label = user_label(user);
        for day in &user.availability {
            let free = day
                .free_periods
                .iter()
                .map(|slot| format_range(slot.start(), slot.end(), viewer_tz))
                .collect::<Vec<_>>()
                .join(SLOT_SEPARATOR);
            let busy = day
                .busy_periods
                .iter()
                .map(|period| format_range(period.start, period.end, viewer_tz))
                .collect::<Vec<_>>()
                .join(SLOT_SEPARATOR);

            push_row(
                &mut out,
                [
                    label.to_string(),
                    day.date.format("%Y-%m-%d").to_string(),
                    day.status.label().to_string(),
                    free,
                    busy,
                ]
                .into_iter(),
            );
        }
    }

    out
}

fn user_label(user: &UserAvailability) -> &str {
    if user.profile.name.trim().is_empty() {
        &user.user_id
    } else {
        &user.profile.name
    }
}

fn format_range(start: DateTime<Utc>, end: DateTime<Utc>, tz: &Tz) -> String {
    format!(
        "{}-{}",
        start.with_timezone(tz).format("%H:%M"),
        end.with_timezone(tz).format("%H:%M")
    )
}

fn push_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let row: Vec<String> = fields.map(|f| escape_field(&f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// Quote a field when it contains a delimiter, quote or line break (RFC 4180).
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
