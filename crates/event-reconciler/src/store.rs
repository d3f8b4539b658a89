//! The single in-memory event list.
//!
//! Every mutation bumps [`EventStore::version`]. Backend listings are applied through
//! [`FetchTicket`]s handed out in issue order: a listing whose ticket is older than the
//! last applied one arrived late and is discarded. A ticket also records the version it
//! was issued at. Events created, changed or removed after that point are newer than the
//! listing and win over it.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::model::{BackendRef, Event, LocalId, Provenance};
use crate::payload::{decode_attendee_items, RemoteEvent};

/// Generation number of an in-flight listing, with the store version it started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket {
    seq: u64,
    version: u64,
}

#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
    /// Known categories and whether each is selected in the filter.
    categories: BTreeMap<String, bool>,
    version: u64,
    /// Version of each event's last local mutation.
    touched: HashMap<LocalId, u64>,
    /// Confirmed events removed since the last applied listing.
    removed: Vec<(u64, Event)>,
    fetch_issued: u64,
    fetch_applied: u64,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn get(&self, id: &LocalId) -> Option<&Event> {
        self.events.iter().find(|e| &e.id == id)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn categories(&self) -> &BTreeMap<String, bool> {
        &self.categories
    }

    /// Append an event and register its category.
    pub fn insert(&mut self, event: Event) {
        self.track_category(&event.category);
        self.touch(&event.id);
        self.events.push(event);
    }

    pub fn remove(&mut self, id: &LocalId) -> Option<Event> {
        let index = self.events.iter().position(|e| &e.id == id)?;
        self.version += 1;
        self.touched.remove(id);
        let event = self.events.remove(index);
        if !event.is_local() {
            self.removed.push((self.version, event.clone()));
        }
        Some(event)
    }

    /// Apply `f` to the event with `id`, returning its result.
    pub fn update<R>(&mut self, id: &LocalId, f: impl FnOnce(&mut Event) -> R) -> Option<R> {
        let event = self.events.iter_mut().find(|e| &e.id == id)?;
        let result = f(event);
        self.touch(id);
        Some(result)
    }

    /// Register a category as known and selected. Blank categories are ignored and
    /// existing selections are left alone.
    pub fn track_category(&mut self, category: &str) {
        let category = category.trim();
        if category.is_empty() || self.categories.contains_key(category) {
            return;
        }
        self.categories.insert(category.to_string(), true);
        self.version += 1;
    }

    /// Change the filter selection of a known category. Returns false when unknown.
    pub fn select_category(&mut self, category: &str, selected: bool) -> bool {
        match self.categories.get_mut(category) {
            Some(current) => {
                *current = selected;
                self.version += 1;
                true
            }
            None => false,
        }
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetch_issued += 1;
        FetchTicket {
            seq: self.fetch_issued,
            version: self.version,
        }
    }

    /// Replace the confirmed events with a backend listing.
    ///
    /// Returns false, leaving the store untouched, if a newer listing was already
    /// applied. Fetched events keep the display id and attendee list of the event they
    /// match, and each previous event is matched at most once. Local events, and
    /// confirmed events mutated after the ticket was issued, are kept as they are.
    /// Items matching an event removed after the ticket was issued are dropped.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, remote: Vec<RemoteEvent>) -> bool {
        if ticket.seq <= self.fetch_applied {
            debug!(
                ticket = ticket.seq,
                applied = self.fetch_applied,
                "discarding stale listing"
            );
            return false;
        }
        self.fetch_applied = ticket.seq;

        let previous = std::mem::take(&mut self.events);
        let removed: Vec<Event> = self
            .removed
            .iter()
            .filter(|(version, _)| *version > ticket.version)
            .map(|(_, event)| event.clone())
            .collect();
        let newer = |event: &Event| {
            self.touched
                .get(&event.id)
                .is_some_and(|version| *version > ticket.version)
        };

        // Removed events are candidates too, so a listing cannot resurrect them.
        let candidates: Vec<&Event> = previous.iter().chain(&removed).collect();
        let matches = match_previous(&candidates, &remote);

        let mut claimed = vec![false; previous.len()];
        let mut events = Vec::with_capacity(remote.len());
        for (item, matched) in remote.into_iter().zip(matches) {
            match matched {
                Some(index) if index >= previous.len() => {
                    debug!(title = %item.title, "dropping listed event removed locally");
                }
                Some(index) => {
                    claimed[index] = true;
                    let prev = &previous[index];
                    if newer(prev) {
                        events.push(prev.clone());
                    } else {
                        events.push(merge_remote(Some(prev), item));
                    }
                }
                None => events.push(merge_remote(None, item)),
            }
        }
        for (event, claimed) in previous.iter().zip(claimed) {
            if !claimed && (event.is_local() || newer(event)) {
                events.push(event.clone());
            }
        }

        self.touched.retain(|_, version| *version > ticket.version);
        self.removed.retain(|(version, _)| *version > ticket.version);
        for event in &events {
            self.track_category(&event.category);
        }
        self.events = events;
        self.version += 1;
        true
    }

    /// Merge a single fetched event into the event with `id`.
    pub fn apply_remote(&mut self, id: &LocalId, remote: RemoteEvent) -> Option<&Event> {
        let index = self.events.iter().position(|e| &e.id == id)?;
        let merged = merge_remote(Some(&self.events[index]), remote);
        self.track_category(&merged.category);
        self.events[index] = merged;
        self.touch(id);
        self.events.get(index)
    }

    fn touch(&mut self, id: &LocalId) {
        self.version += 1;
        self.touched.insert(id.clone(), self.version);
    }
}

/// For each fetched item, the index of the confirmed candidate it corresponds to.
///
/// Items with a backend id match by that id, or by display id for events whose create
/// response carried no id. Items without one match by title and start. Id matches are
/// resolved first and every candidate is claimed at most once.
fn match_previous(candidates: &[&Event], items: &[RemoteEvent]) -> Vec<Option<usize>> {
    let mut claimed = vec![false; candidates.len()];
    let mut matches = vec![None; items.len()];
    let mut claim = |is_match: &dyn Fn(&Event) -> bool| -> Option<usize> {
        let index = candidates
            .iter()
            .enumerate()
            .position(|(i, e)| !claimed[i] && !e.is_local() && is_match(*e))?;
        claimed[index] = true;
        Some(index)
    };

    for (slot, item) in matches.iter_mut().zip(items) {
        if let Some(remote) = &item.id {
            *slot = claim(&|e: &Event| {
                e.backend_id() == Some(remote) || e.id.as_str() == remote.as_str()
            });
        }
    }
    for (slot, item) in matches.iter_mut().zip(items) {
        if item.id.is_none() {
            *slot = claim(&|e: &Event| e.title == item.title && e.start == item.start);
        }
    }
    matches
}

fn merge_remote(previous: Option<&Event>, item: RemoteEvent) -> Event {
    let id = match (previous, &item.id) {
        (Some(prev), _) => prev.id.clone(),
        (None, Some(remote)) => LocalId::from(remote),
        (None, None) => LocalId::generate_fallback(),
    };
    let provenance = Provenance::BackendConfirmed(match item.id {
        Some(remote) => BackendRef::Valid(remote),
        None => BackendRef::Degraded,
    });

    let attendees = match previous {
        Some(prev) if !prev.attendees.is_empty() => prev.attendees.clone(),
        _ => item
            .attendees
            .as_deref()
            .map(|items| decode_attendee_items(items, &id))
            .unwrap_or_default(),
    };

    Event {
        id,
        provenance,
        title: item.title,
        description: item.description,
        start: item.start,
        end: item.end,
        category: item.category,
        priority: item.priority,
        completed: item.completed,
        location: item.location,
        attendees,
        color: item.color,
        all_day: item.all_day,
    }
}
