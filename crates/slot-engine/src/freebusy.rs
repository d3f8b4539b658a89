//! Interval arithmetic over free periods.
//!
//! Free period lists are normalized (sorted, overlapping or adjacent periods merged)
//! before they are intersected, so callers can pass slots in rule order.

use crate::slot::TimeSlot;

/// Sort slots and merge overlapping or adjacent ones.
///
/// Returns a sorted, non-overlapping list.
pub fn normalize(slots: &[TimeSlot]) -> Vec<TimeSlot> {
    let mut sorted = slots.to_vec();
    sorted.sort();

    let mut merged: Vec<TimeSlot> = Vec::with_capacity(sorted.len());
    for slot in sorted {
        if let Some(last) = merged.last_mut() {
            if slot.start() <= last.end() {
                // Overlapping or adjacent — extend the current slot.
                if slot.end() > last.end() {
                    if let Ok(extended) = TimeSlot::new(last.start(), slot.end()) {
                        *last = extended;
                    }
                }
                continue;
            }
        }
        merged.push(slot);
    }

    merged
}

/// Intersect two free period lists with a two-pointer sweep.
fn intersect_pair(a: &[TimeSlot], b: &[TimeSlot]) -> Vec<TimeSlot> {
    let mut common = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if let Some(overlap) = a[i].intersection(&b[j]) {
            common.push(overlap);
        }
        // Advance whichever period finishes first; it cannot overlap anything further.
        if a[i].end() < b[j].end() {
            i += 1;
        } else {
            j += 1;
        }
    }

    common
}

/// Periods free for every participant.
///
/// Each element of `participants` is one participant's free periods. An empty
/// participant list yields no common time.
pub fn intersect_free_periods(participants: &[&[TimeSlot]]) -> Vec<TimeSlot> {
    let Some((first, rest)) = participants.split_first() else {
        return Vec::new();
    };

    rest.iter().fold(normalize(first), |common, periods| {
        if common.is_empty() {
            return common;
        }
        intersect_pair(&common, &normalize(periods))
    })
}
