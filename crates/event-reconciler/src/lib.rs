//! # event-reconciler
//!
//! One in-memory event list fed by two sources: events confirmed by a REST backend and
//! events that only exist locally because the backend was unreachable when they were
//! created. Every mutation tries the backend first and falls back to local state on
//! transient failures, reporting the fallback as a soft [`SyncOutcome`] rather than an
//! error. Rejections by the backend are surfaced.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::{Duration, Utc};
//! use event_reconciler::{EventDraft, EventReconciler, HttpBackend};
//!
//! # async fn demo() -> event_reconciler::Result<()> {
//! let backend = Arc::new(HttpBackend::new("http://localhost:3000/api"));
//! let reconciler = EventReconciler::new(backend);
//! reconciler.refresh().await;
//!
//! let start = Utc::now();
//! let created = reconciler
//!     .create_event(EventDraft::new("Design review", start, start + Duration::hours(1)))
//!     .await?;
//! if created.sync.needs_notice() {
//!     eprintln!("saved locally only");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`reconciler`] — event and attendee operations
//! - [`availability`] — cached availability checks with local fallback
//! - [`store`] — the versioned event list
//! - [`model`] — events, attendees, ids and provenance
//! - [`payload`] — tolerant decoding of backend responses
//! - [`backend`] — the backend trait; [`http`] implements it over HTTP
//! - [`outcome`] — how an applied change reached the backend
//! - [`error`] — Error types

pub mod availability;
pub mod backend;
pub mod error;
pub mod http;
pub mod model;
pub mod outcome;
pub mod payload;
pub mod reconciler;
pub mod store;

pub use availability::{AvailabilityService, FetchOutcome, ServiceConfig, SnapshotSource};
pub use backend::{AvailabilityQuery, CalendarBackend, EventPatch};
pub use error::{BackendError, ReconcileError, Result};
pub use http::HttpBackend;
pub use model::{
    Attendee, AttendeeRef, AttendeeStatus, BackendRef, Event, EventDraft, LocalId, NewAttendee,
    Priority, Provenance, RemoteId,
};
pub use outcome::{Applied, SyncOutcome};
pub use reconciler::{EventReconciler, RefreshOutcome};
