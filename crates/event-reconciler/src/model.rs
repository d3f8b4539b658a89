//! Event and attendee records with explicit provenance.
//!
//! An event's identity is split in two. `id` is the display id the UI keys on and is
//! always present. The backend id lives inside [`Provenance`] and only exists for events
//! the backend confirmed. Nothing here infers provenance from the shape of an id string.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slot_engine::ScheduledEvent;
use uuid::Uuid;

use crate::error::{ReconcileError, Result};

/// Display identifier of an event in the in-memory list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(String);

impl LocalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for an event that exists only locally.
    pub fn generate_local() -> Self {
        Self(format!("local-{}", Uuid::new_v4()))
    }

    /// Fresh id for a confirmed event whose create response carried no id.
    pub fn generate_fallback() -> Self {
        Self(format!("evt-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&RemoteId> for LocalId {
    fn from(remote: &RemoteId) -> Self {
        Self(remote.0.clone())
    }
}

/// Identifier assigned by the backend. Never empty or a placeholder string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Accept a backend id, rejecting blanks and serialized placeholders
    /// (`"undefined"`, `"null"`, `"NaN"`).
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || matches!(trimmed, "undefined" | "null" | "NaN") {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Accept a JSON id that may be a string or an integer.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::parse(&n.to_string()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How much the backend knows about a confirmed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendRef {
    Valid(RemoteId),
    /// Confirmed by the backend, but no usable id was ever returned.
    Degraded,
}

/// Where an event's state came from.
///
/// Once confirmed, an event stays confirmed. Failed remote calls fall back per call and
/// never downgrade it to `Local`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Provenance {
    /// Created while the backend was unreachable. Never triggers remote calls.
    Local,
    BackendConfirmed(BackendRef),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Case-insensitive parse; unknown values map to the default.
    pub fn from_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" | "urgent" => Priority::High,
            _ => Priority::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Tentative,
}

impl AttendeeStatus {
    /// Case-insensitive parse accepting common calendar spellings.
    pub fn from_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "accepted" | "yes" => AttendeeStatus::Accepted,
            "declined" | "no" => AttendeeStatus::Declined,
            "tentative" | "maybe" => AttendeeStatus::Tentative,
            _ => AttendeeStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    /// Backend id; `None` until the backend has confirmed this attendee.
    pub id: Option<RemoteId>,
    /// Stable display key, derived from the event and email when `id` is absent.
    pub key: String,
    pub name: String,
    pub email: String,
    pub status: AttendeeStatus,
}

impl Attendee {
    /// Stable key for an attendee of `event`, independent of backend ids.
    pub fn synthetic_key(event: &LocalId, email: &str) -> String {
        format!("{}:{}", event, email.trim().to_ascii_lowercase())
    }

    pub fn new(event: &LocalId, id: Option<RemoteId>, name: String, email: String) -> Self {
        let key = match &id {
            Some(remote) => remote.to_string(),
            None => Self::synthetic_key(event, &email),
        };
        Self {
            id,
            key,
            name,
            email,
            status: AttendeeStatus::Pending,
        }
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

/// Request to add an attendee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttendee {
    pub name: String,
    pub email: String,
}

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

impl NewAttendee {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// # Errors
    /// Returns `ReconcileError::Validation` if the email is malformed.
    pub fn validate(&self) -> Result<()> {
        if EMAIL_PATTERN.is_match(self.email.trim()) {
            Ok(())
        } else {
            Err(ReconcileError::Validation(format!(
                "invalid email address: '{}'",
                self.email
            )))
        }
    }
}

/// How a caller points at an attendee: by backend id, or by email when only a
/// bare address list is at hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendeeRef {
    Id(RemoteId),
    Email(String),
}

impl AttendeeRef {
    pub fn matches(&self, attendee: &Attendee) -> bool {
        match self {
            AttendeeRef::Id(id) => attendee.id.as_ref() == Some(id),
            AttendeeRef::Email(email) => attendee.has_email(email),
        }
    }
}

impl fmt::Display for AttendeeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendeeRef::Id(id) => write!(f, "id {id}"),
            AttendeeRef::Email(email) => write!(f, "email {email}"),
        }
    }
}

/// User-submitted form data for a new event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub all_day: bool,
}

impl EventDraft {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            start,
            end,
            category: String::new(),
            priority: Priority::default(),
            location: String::new(),
            color: String::new(),
            all_day: false,
        }
    }

    /// # Errors
    /// Returns `ReconcileError::Validation` for a blank title or an empty time range.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ReconcileError::Validation("event title is required".into()));
        }
        if self.end <= self.start {
            return Err(ReconcileError::Validation(format!(
                "event end {} must be after start {}",
                self.end.to_rfc3339(),
                self.start.to_rfc3339()
            )));
        }
        Ok(())
    }

    pub(crate) fn into_event(self, id: LocalId, provenance: Provenance) -> Event {
        Event {
            id,
            provenance,
            title: self.title,
            description: self.description,
            start: self.start,
            end: self.end,
            category: self.category,
            priority: self.priority,
            completed: false,
            location: self.location,
            attendees: Vec::new(),
            color: self.color,
            all_day: self.all_day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: LocalId,
    pub provenance: Provenance,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub category: String,
    pub priority: Priority,
    pub completed: bool,
    pub location: String,
    pub attendees: Vec<Attendee>,
    pub color: String,
    pub all_day: bool,
}

impl Event {
    /// The backend id, when the event is confirmed with a usable one.
    pub fn backend_id(&self) -> Option<&RemoteId> {
        match &self.provenance {
            Provenance::BackendConfirmed(BackendRef::Valid(id)) => Some(id),
            _ => None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.provenance == Provenance::Local
    }

    /// The engine's view of this event, for availability computation.
    pub fn as_scheduled(&self) -> ScheduledEvent {
        ScheduledEvent {
            start: self.start,
            end: self.end,
            title: (!self.title.is_empty()).then(|| self.title.clone()),
            all_day: self.all_day,
        }
    }
}
