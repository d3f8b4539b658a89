//! The REST backend as seen by the reconciler.
//!
//! Every call returns the response payload as raw JSON. Payload nesting varies across
//! backend versions and is handled by [`payload`](crate::payload), not by implementors.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::error::BackendResult;
use crate::model::{AttendeeStatus, EventDraft, NewAttendee, RemoteId};

/// Parameters of an availability request; also the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timezone: String,
}

impl AvailabilityQuery {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, timezone: impl Into<String>) -> Self {
        Self {
            start_date,
            end_date,
            timezone: timezone.into(),
        }
    }
}

/// Partial update of an event. Unset fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl EventPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

/// Remote calendar service.
///
/// Implementations classify failures into [`BackendError`](crate::error::BackendError)
/// variants; they never retry and never time out on their own.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    async fn get_availability(&self, query: &AvailabilityQuery) -> BackendResult<Value>;

    async fn create_event(&self, draft: &EventDraft) -> BackendResult<Value>;

    async fn update_event(&self, id: &RemoteId, patch: &EventPatch) -> BackendResult<Value>;

    async fn delete_event(&self, id: &RemoteId) -> BackendResult<Value>;

    async fn get_event(&self, id: &RemoteId) -> BackendResult<Value>;

    async fn list_events(&self) -> BackendResult<Value>;

    async fn get_attendees(&self, event_id: &RemoteId) -> BackendResult<Value>;

    async fn add_attendee(
        &self,
        event_id: &RemoteId,
        attendee: &NewAttendee,
    ) -> BackendResult<Value>;

    async fn remove_attendee(
        &self,
        event_id: &RemoteId,
        attendee_id: &RemoteId,
    ) -> BackendResult<Value>;

    async fn update_attendee_status(
        &self,
        event_id: &RemoteId,
        attendee_id: &RemoteId,
        status: AttendeeStatus,
    ) -> BackendResult<Value>;
}
