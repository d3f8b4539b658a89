//! Scripted in-memory backend shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::Notify;

use event_reconciler::backend::{AvailabilityQuery, CalendarBackend, EventPatch};
use event_reconciler::error::{BackendError, BackendResult};
use event_reconciler::model::{AttendeeStatus, EventDraft, NewAttendee, RemoteId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetAvailability,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    GetEvent,
    ListEvents,
    GetAttendees,
    AddAttendee,
    RemoveAttendee,
    UpdateAttendeeStatus,
}

/// Replays scripted responses per operation, in order. An unscripted call fails as
/// `Unavailable`, which is what a dead network looks like to the reconciler.
///
/// Calls to a [`hold`](MockBackend::hold)-ed operation wait for
/// [`release`](MockBackend::release) before answering.
#[derive(Default)]
pub struct MockBackend {
    scripts: Mutex<HashMap<Op, VecDeque<BackendResult<Value>>>>,
    calls: Mutex<Vec<(Op, String)>>,
    held: Mutex<HashSet<Op>>,
    entered: Notify,
    released: Notify,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(&self, op: Op, value: Value) -> &Self {
        self.push(op, Ok(value))
    }

    pub fn fail(&self, op: Op, err: BackendError) -> &Self {
        self.push(op, Err(err))
    }

    fn push(&self, op: Op, result: BackendResult<Value>) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(result);
        self
    }

    pub fn hold(&self, op: Op) {
        self.held.lock().unwrap().insert(op);
    }

    /// Wait until a held call has been made.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().iter().filter(|(o, _)| *o == op).count()
    }

    /// The path-like targets passed to `op`, in call order.
    pub fn targets(&self, op: Op) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, target)| target.clone())
            .collect()
    }

    async fn next(&self, op: Op, target: String) -> BackendResult<Value> {
        self.calls.lock().unwrap().push((op, target));
        let result = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(BackendError::Unavailable("connection refused".into())));
        let held = self.held.lock().unwrap().remove(&op);
        if held {
            self.entered.notify_one();
            self.released.notified().await;
        }
        result
    }
}

#[async_trait]
impl CalendarBackend for MockBackend {
    async fn get_availability(&self, query: &AvailabilityQuery) -> BackendResult<Value> {
        let target = format!("{}..{}@{}", query.start_date, query.end_date, query.timezone);
        self.next(Op::GetAvailability, target).await
    }

    async fn create_event(&self, draft: &EventDraft) -> BackendResult<Value> {
        self.next(Op::CreateEvent, draft.title.clone()).await
    }

    async fn update_event(&self, id: &RemoteId, patch: &EventPatch) -> BackendResult<Value> {
        self.next(Op::UpdateEvent, format!("{id}:{:?}", patch.completed)).await
    }

    async fn delete_event(&self, id: &RemoteId) -> BackendResult<Value> {
        self.next(Op::DeleteEvent, id.to_string()).await
    }

    async fn get_event(&self, id: &RemoteId) -> BackendResult<Value> {
        self.next(Op::GetEvent, id.to_string()).await
    }

    async fn list_events(&self) -> BackendResult<Value> {
        self.next(Op::ListEvents, String::new()).await
    }

    async fn get_attendees(&self, event_id: &RemoteId) -> BackendResult<Value> {
        self.next(Op::GetAttendees, event_id.to_string()).await
    }

    async fn add_attendee(
        &self,
        event_id: &RemoteId,
        attendee: &NewAttendee,
    ) -> BackendResult<Value> {
        self.next(Op::AddAttendee, format!("{event_id}/{}", attendee.email)).await
    }

    async fn remove_attendee(
        &self,
        event_id: &RemoteId,
        attendee_id: &RemoteId,
    ) -> BackendResult<Value> {
        self.next(Op::RemoveAttendee, format!("{event_id}/{attendee_id}")).await
    }

    async fn update_attendee_status(
        &self,
        event_id: &RemoteId,
        attendee_id: &RemoteId,
        status: AttendeeStatus,
    ) -> BackendResult<Value> {
        self.next(
            Op::UpdateAttendeeStatus,
            format!("{event_id}/{attendee_id}:{status:?}"),
        )
        .await
    }
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, mi, 0).unwrap()
}

/// A one-hour draft on Monday 2024-06-03 starting at `hour` UTC.
pub fn draft(title: &str, hour: u32) -> EventDraft {
    EventDraft::new(title, utc(2024, 6, 3, hour, 0), utc(2024, 6, 3, hour + 1, 0))
}

/// Backend JSON for a one-hour event on 2024-06-03.
pub fn event_json(id: &str, title: &str, hour: u32) -> Value {
    json!({
        "id": id,
        "title": title,
        "start": format!("2024-06-03T{hour:02}:00:00Z"),
        "end": format!("2024-06-03T{:02}:00:00Z", hour + 1),
        "category": "work",
        "priority": "high",
        "completed": false
    })
}

pub fn rejected(status: u16) -> BackendError {
    BackendError::Rejected {
        status,
        message: "Forbidden".into(),
    }
}
