//! Tolerant decoding of backend payloads.

use event_reconciler::payload::{
    decode_attendee, decode_attendee_list, decode_event, decode_event_list, decode_snapshot,
    extract_id,
};
use event_reconciler::{AttendeeStatus, BackendError, LocalId, Priority, RemoteId};
use serde_json::json;

fn event_item() -> serde_json::Value {
    json!({
        "_id": "e1",
        "summary": "Retro",
        "startTime": "2024-06-03T15:00:00Z",
        "endTime": "2024-06-03T16:00:00Z",
        "priority": "HIGH",
        "description": null,
        "isAllDay": false
    })
}

// ── Test 1: event lists ─────────────────────────────────────────────────────

#[test]
fn event_list_aliases_and_nulls_are_tolerated() {
    let events = decode_event_list(&json!([event_item()])).unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.id, RemoteId::parse("e1"));
    assert_eq!(event.title, "Retro");
    assert_eq!(event.priority, Priority::High);
    assert_eq!(event.description, "");
    assert_eq!(event.attendees, None);
}

#[test]
fn placeholder_ids_decode_as_missing() {
    let mut item = event_item();
    item["_id"] = json!("undefined");
    let events = decode_event_list(&json!({ "data": [item] })).unwrap();
    assert_eq!(events[0].id, None);
}

#[test]
fn unknown_list_shape_is_a_data_shape_error() {
    for payload in [json!({ "events": [] }), json!("oops"), json!(null)] {
        assert!(matches!(
            decode_event_list(&payload),
            Err(BackendError::DataShape(_))
        ));
    }
}

#[test]
fn empty_list_is_not_an_error() {
    assert!(decode_event_list(&json!({ "data": { "events": [] } }))
        .unwrap()
        .is_empty());
}

// ── Test 2: single objects ──────────────────────────────────────────────────

#[test]
fn single_event_in_each_nesting() {
    for payload in [
        event_item(),
        json!({ "data": event_item() }),
        json!({ "data": { "event": event_item() } }),
    ] {
        assert_eq!(decode_event(&payload).unwrap().title, "Retro");
    }
}

#[test]
fn extract_id_prefers_nested_event() {
    assert_eq!(
        extract_id(&json!({ "data": { "event": { "id": "n" }, "id": "outer" } })),
        RemoteId::parse("n")
    );
    assert_eq!(extract_id(&json!({ "eventId": 12 })), RemoteId::parse("12"));
    assert_eq!(extract_id(&json!({ "data": { "id": "" } })), None);
}

// ── Test 3: attendees ───────────────────────────────────────────────────────

#[test]
fn attendee_list_mixes_strings_and_objects() {
    let event = LocalId::new("e1");
    let payload = json!({ "data": [
        "ann@example.com",
        { "attendeeId": "b2", "displayName": "Bob", "email": "bob@example.com", "responseStatus": "yes" },
        { "name": "no email" },
        42
    ]});

    let attendees = decode_attendee_list(&payload, &event).unwrap();
    assert_eq!(attendees.len(), 2);
    assert_eq!(attendees[0].key, "e1:ann@example.com");
    assert_eq!(attendees[1].id, RemoteId::parse("b2"));
    assert_eq!(attendees[1].key, "b2");
    assert_eq!(attendees[1].status, AttendeeStatus::Accepted);
}

#[test]
fn single_attendee_requires_email() {
    let event = LocalId::new("e1");
    assert!(decode_attendee(&json!({ "data": { "attendee": { "id": "x" } } }), &event).is_err());
    let attendee = decode_attendee(
        &json!({ "data": { "id": "x", "email": "x@example.com", "status": "maybe" } }),
        &event,
    )
    .unwrap();
    assert_eq!(attendee.status, AttendeeStatus::Tentative);
}

// ── Test 4: availability snapshots ──────────────────────────────────────────

#[test]
fn snapshot_flat_or_wrapped() {
    let snapshot = json!({
        "users": [],
        "summary": {
            "totalUsers": 0,
            "totalDays": 1,
            "commonFreeSlots": [],
            "dateRange": { "start": "2024-06-03", "end": "2024-06-03" }
        }
    });
    let flat = decode_snapshot(&snapshot).unwrap();
    let wrapped = decode_snapshot(&json!({ "success": true, "data": snapshot })).unwrap();
    assert_eq!(flat, wrapped);
    assert_eq!(flat.summary.total_days, 1);

    assert!(decode_snapshot(&json!({ "data": { "nope": 1 } })).is_err());
}
