//! Error types for event reconciliation.
//!
//! [`BackendError`] classifies what went wrong on the wire. Only some of it reaches
//! callers. Unavailable backends and unexpected payload shapes are recovered locally and
//! reported through [`SyncOutcome`](crate::outcome::SyncOutcome), while rejections and
//! validation failures surface as [`ReconcileError`].

use thiserror::Error;

use crate::model::LocalId;

/// Outcome of a single backend call that did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Network failure or a 5xx response. Transient; callers fall back to local state.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend has no such resource (HTTP 404).
    #[error("Not found on backend")]
    NotFound,

    /// A 4xx other than 404, or a failure envelope. Terminal for the request.
    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response decoded as JSON but matched none of the known payload shapes.
    #[error("Unexpected payload shape: {0}")]
    DataShape(String),
}

impl BackendError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => BackendError::NotFound,
            400..=499 => BackendError::Rejected { status, message },
            _ => BackendError::Unavailable(format!("HTTP {status}: {message}")),
        }
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Errors surfaced to callers of the reconciler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Event not found: {0}")]
    UnknownEvent(LocalId),

    #[error("Attendee not found: {0}")]
    UnknownAttendee(String),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
