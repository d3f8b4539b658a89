//! HTTP implementation of [`CalendarBackend`] over `reqwest`.
//!
//! Routes follow the dashboard API:
//!
//! | call | route |
//! |---|---|
//! | availability | `GET /availability?startDate&endDate&timezone` |
//! | events | `GET/POST /events`, `GET/PATCH/DELETE /events/{id}` |
//! | attendees | `GET/POST /events/{id}/attendees`, `PATCH/DELETE /events/{id}/attendees/{aid}` |
//!
//! Responses may carry a `{ success, data, error }` envelope. A body with
//! `success: false` is a rejection even when the HTTP status is 2xx.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};
use tracing::debug;

use crate::backend::{AvailabilityQuery, CalendarBackend, EventPatch};
use crate::error::{BackendError, BackendResult};
use crate::model::{AttendeeStatus, EventDraft, NewAttendee, RemoteId};

/// REST client for the dashboard backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Use a preconfigured client (timeouts, default headers, auth).
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        debug!(status = status.as_u16(), bytes = text.len(), "backend response");

        let body = parse_body(&text);
        if !status.is_success() {
            let message = body
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| status.to_string());
            return Err(BackendError::from_status(status.as_u16(), message));
        }

        match body {
            Some(body) => check_envelope(status.as_u16(), body),
            None if text.trim().is_empty() => Ok(Value::Null),
            None => Err(BackendError::DataShape(format!(
                "response body is not JSON ({} bytes)",
                text.len()
            ))),
        }
    }
}

fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}

fn error_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Turn a `success: false` envelope into a rejection; pass anything else through.
fn check_envelope(status: u16, body: Value) -> BackendResult<Value> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = error_message(&body).unwrap_or_else(|| "request failed".to_string());
        return Err(BackendError::Rejected { status, message });
    }
    Ok(body)
}

#[async_trait]
impl CalendarBackend for HttpBackend {
    async fn get_availability(&self, query: &AvailabilityQuery) -> BackendResult<Value> {
        let start = query.start_date.format("%Y-%m-%d").to_string();
        let end = query.end_date.format("%Y-%m-%d").to_string();
        let request = self.request(Method::GET, "/availability").query(&[
            ("startDate", start.as_str()),
            ("endDate", end.as_str()),
            ("timezone", query.timezone.as_str()),
        ]);
        self.send(request).await
    }

    async fn create_event(&self, draft: &EventDraft) -> BackendResult<Value> {
        self.send(self.request(Method::POST, "/events").json(draft))
            .await
    }

    async fn update_event(&self, id: &RemoteId, patch: &EventPatch) -> BackendResult<Value> {
        self.send(self.request(Method::PATCH, &format!("/events/{id}")).json(patch))
            .await
    }

    async fn delete_event(&self, id: &RemoteId) -> BackendResult<Value> {
        self.send(self.request(Method::DELETE, &format!("/events/{id}")))
            .await
    }

    async fn get_event(&self, id: &RemoteId) -> BackendResult<Value> {
        self.send(self.request(Method::GET, &format!("/events/{id}")))
            .await
    }

    async fn list_events(&self) -> BackendResult<Value> {
        self.send(self.request(Method::GET, "/events")).await
    }

    async fn get_attendees(&self, event_id: &RemoteId) -> BackendResult<Value> {
        self.send(self.request(Method::GET, &format!("/events/{event_id}/attendees")))
            .await
    }

    async fn add_attendee(
        &self,
        event_id: &RemoteId,
        attendee: &NewAttendee,
    ) -> BackendResult<Value> {
        self.send(
            self.request(Method::POST, &format!("/events/{event_id}/attendees"))
                .json(attendee),
        )
        .await
    }

    async fn remove_attendee(
        &self,
        event_id: &RemoteId,
        attendee_id: &RemoteId,
    ) -> BackendResult<Value> {
        self.send(self.request(
            Method::DELETE,
            &format!("/events/{event_id}/attendees/{attendee_id}"),
        ))
        .await
    }

    async fn update_attendee_status(
        &self,
        event_id: &RemoteId,
        attendee_id: &RemoteId,
        status: AttendeeStatus,
    ) -> BackendResult<Value> {
        self.send(
            self.request(
                Method::PATCH,
                &format!("/events/{event_id}/attendees/{attendee_id}"),
            )
            .json(&json!({ "status": status })),
        )
        .await
    }
}
