//! Defensive decoding of backend payloads.
//!
//! The backend has historically nested its payloads in several ways. Each known nesting
//! is a small matcher returning `Some(..)` when it applies. Matchers are tried in order
//! and the first hit wins. Items inside a matched list that fail to decode are skipped
//! with a warning. Only when no matcher applies does decoding fail with
//! [`BackendError::DataShape`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use slot_engine::AvailabilitySnapshot;
use tracing::{debug, warn};

use crate::error::{BackendError, BackendResult};
use crate::model::{Attendee, AttendeeStatus, LocalId, Priority, RemoteId};

type ListShape = fn(&Value) -> Option<&Vec<Value>>;
type ObjectShape = fn(&Value) -> Option<&Value>;

// ---------------------------------------------------------------------------
// Shape matchers
// ---------------------------------------------------------------------------

fn flat_list(v: &Value) -> Option<&Vec<Value>> {
    v.as_array()
}

fn data_list(v: &Value) -> Option<&Vec<Value>> {
    v.get("data")?.as_array()
}

fn data_events_list(v: &Value) -> Option<&Vec<Value>> {
    v.get("data")?.get("events")?.as_array()
}

fn data_attendees_list(v: &Value) -> Option<&Vec<Value>> {
    v.get("data")?.get("attendees")?.as_array()
}

fn data_event_object(v: &Value) -> Option<&Value> {
    v.get("data")?.get("event").filter(|o| o.is_object())
}

fn data_attendee_object(v: &Value) -> Option<&Value> {
    v.get("data")?.get("attendee").filter(|o| o.is_object())
}

fn data_object(v: &Value) -> Option<&Value> {
    v.get("data").filter(|o| o.is_object())
}

fn flat_object(v: &Value) -> Option<&Value> {
    (v.is_object() && v.get("data").is_none()).then_some(v)
}

/// Event lists: `[...]`, `{data: [...]}`, `{data: {events: [...]}}`.
const EVENT_LIST_SHAPES: &[(&str, ListShape)] = &[
    ("array", flat_list),
    ("data", data_list),
    ("data.events", data_events_list),
];

/// Attendee lists: `[...]`, `{data: [...]}`, `{data: {attendees: [...]}}`.
const ATTENDEE_LIST_SHAPES: &[(&str, ListShape)] = &[
    ("array", flat_list),
    ("data", data_list),
    ("data.attendees", data_attendees_list),
];

const EVENT_OBJECT_SHAPES: &[(&str, ObjectShape)] = &[
    ("data.event", data_event_object),
    ("data", data_object),
    ("object", flat_object),
];

const ATTENDEE_OBJECT_SHAPES: &[(&str, ObjectShape)] = &[
    ("data.attendee", data_attendee_object),
    ("data", data_object),
    ("object", flat_object),
];

const SNAPSHOT_SHAPES: &[(&str, ObjectShape)] = &[("data", data_object), ("object", flat_object)];

/// First list matcher that applies to `payload`.
pub fn match_list<'a>(
    payload: &'a Value,
    shapes: &[(&'static str, ListShape)],
) -> Option<(&'static str, &'a [Value])> {
    shapes
        .iter()
        .find_map(|(name, shape)| shape(payload).map(|items| (*name, items.as_slice())))
}

/// First object matcher that applies to `payload`.
pub fn match_object<'a>(
    payload: &'a Value,
    shapes: &[(&'static str, ObjectShape)],
) -> Option<(&'static str, &'a Value)> {
    shapes
        .iter()
        .find_map(|(name, shape)| shape(payload).map(|object| (*name, object)))
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<RemoteId>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(RemoteId::from_json))
}

fn lenient_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Priority, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => Priority::from_lenient(&raw),
        _ => Priority::default(),
    })
}

fn lenient_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AttendeeStatus, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => AttendeeStatus::from_lenient(&raw),
        _ => AttendeeStatus::default(),
    })
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// An event as reported by the backend, before it is reconciled into the store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    #[serde(default, alias = "_id", alias = "eventId", deserialize_with = "lenient_id")]
    pub id: Option<RemoteId>,
    #[serde(default, alias = "summary", deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(alias = "startTime", alias = "start_time")]
    pub start: DateTime<Utc>,
    #[serde(alias = "endTime", alias = "end_time")]
    pub end: DateTime<Utc>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Priority,
    #[serde(default, alias = "isCompleted", deserialize_with = "nullable")]
    pub completed: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub location: String,
    #[serde(default, deserialize_with = "nullable")]
    pub color: String,
    #[serde(default, alias = "isAllDay", deserialize_with = "nullable")]
    pub all_day: bool,
    /// Raw attendee items; `None` when the listing omitted them.
    #[serde(default)]
    pub attendees: Option<Vec<Value>>,
}

/// Decode an event listing, skipping items that do not decode.
///
/// # Errors
/// Returns `BackendError::DataShape` when no known list nesting matches.
pub fn decode_event_list(payload: &Value) -> BackendResult<Vec<RemoteEvent>> {
    let (shape, items) = match_list(payload, EVENT_LIST_SHAPES)
        .ok_or_else(|| BackendError::DataShape(describe("event list", payload)))?;
    debug!(shape, count = items.len(), "matched event list payload");

    Ok(items
        .iter()
        .filter_map(|item| match RemoteEvent::deserialize(item) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(error = %err, "skipping undecodable event in listing");
                None
            }
        })
        .collect())
}

/// Decode a single event response.
///
/// # Errors
/// Returns `BackendError::DataShape` when no nesting yields a decodable event.
pub fn decode_event(payload: &Value) -> BackendResult<RemoteEvent> {
    EVENT_OBJECT_SHAPES
        .iter()
        .filter_map(|(_, shape)| shape(payload))
        .find_map(|object| RemoteEvent::deserialize(object).ok())
        .ok_or_else(|| BackendError::DataShape(describe("event", payload)))
}

/// Pull the backend id out of a single-object response (e.g. a create response).
pub fn extract_id(payload: &Value) -> Option<RemoteId> {
    let shapes = [EVENT_OBJECT_SHAPES, ATTENDEE_OBJECT_SHAPES];
    shapes.iter().find_map(|shapes| {
        let (_, object) = match_object(payload, shapes)?;
        ["id", "_id", "eventId", "attendeeId"]
            .iter()
            .find_map(|key| object.get(*key).and_then(RemoteId::from_json))
    })
}

// ---------------------------------------------------------------------------
// Attendees
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteAttendee {
    #[serde(default, alias = "_id", alias = "attendeeId", deserialize_with = "lenient_id")]
    id: Option<RemoteId>,
    #[serde(default, alias = "displayName", deserialize_with = "nullable")]
    name: String,
    email: String,
    #[serde(default, alias = "responseStatus", deserialize_with = "lenient_status")]
    status: AttendeeStatus,
}

/// Decode one attendee item. Bare strings are treated as email addresses.
fn attendee_from_item(item: &Value, event: &LocalId) -> Option<Attendee> {
    match item {
        Value::String(email) if !email.trim().is_empty() => Some(Attendee::new(
            event,
            None,
            String::new(),
            email.trim().to_string(),
        )),
        Value::Object(_) => {
            let remote = RemoteAttendee::deserialize(item).ok()?;
            if remote.email.trim().is_empty() {
                return None;
            }
            let mut attendee =
                Attendee::new(event, remote.id, remote.name, remote.email.trim().to_string());
            attendee.status = remote.status;
            Some(attendee)
        }
        _ => None,
    }
}

/// Normalize raw attendee items, skipping ones without a usable email.
pub fn decode_attendee_items(items: &[Value], event: &LocalId) -> Vec<Attendee> {
    items
        .iter()
        .filter_map(|item| {
            let attendee = attendee_from_item(item, event);
            if attendee.is_none() {
                warn!(event = %event, "skipping undecodable attendee");
            }
            attendee
        })
        .collect()
}

/// Decode an attendee listing for `event`.
///
/// # Errors
/// Returns `BackendError::DataShape` when no known list nesting matches.
pub fn decode_attendee_list(payload: &Value, event: &LocalId) -> BackendResult<Vec<Attendee>> {
    let (shape, items) = match_list(payload, ATTENDEE_LIST_SHAPES)
        .ok_or_else(|| BackendError::DataShape(describe("attendee list", payload)))?;
    debug!(shape, count = items.len(), event = %event, "matched attendee list payload");
    Ok(decode_attendee_items(items, event))
}

/// Decode a single attendee (e.g. an add-attendee response).
///
/// # Errors
/// Returns `BackendError::DataShape` when no nesting yields an attendee with an email.
pub fn decode_attendee(payload: &Value, event: &LocalId) -> BackendResult<Attendee> {
    match_object(payload, ATTENDEE_OBJECT_SHAPES)
        .and_then(|(_, object)| attendee_from_item(object, event))
        .ok_or_else(|| BackendError::DataShape(describe("attendee", payload)))
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Decode an availability snapshot, flat or wrapped in `{data: ...}`.
///
/// # Errors
/// Returns `BackendError::DataShape` when neither nesting decodes.
pub fn decode_snapshot(payload: &Value) -> BackendResult<AvailabilitySnapshot> {
    SNAPSHOT_SHAPES
        .iter()
        .filter_map(|(_, shape)| shape(payload))
        .find_map(|object| AvailabilitySnapshot::deserialize(object).ok())
        .ok_or_else(|| BackendError::DataShape(describe("availability snapshot", payload)))
}

fn describe(what: &str, payload: &Value) -> String {
    let kind = match payload {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    format!("no known {what} shape matches a {kind} payload")
}
