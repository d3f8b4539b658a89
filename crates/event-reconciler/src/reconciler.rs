//! Event operations under a try-remote, fall-back-to-local policy.
//!
//! Operations on the same event are serialized by a per-event async mutex. The store
//! lock is only held between remote calls, never across one, so a slow backend call on
//! one event does not block reads or operations on others. A listing that was in flight
//! while an event changed does not overwrite that change (see
//! [`EventStore::apply_fetch`](crate::store::EventStore::apply_fetch)).
//!
//! Failure taxonomy for remote calls:
//!
//! | backend result | effect |
//! |---|---|
//! | success | applied, `SyncOutcome::Remote` |
//! | 404 on a removal | already gone, applied as `Remote` |
//! | other 4xx / failure envelope | `ReconcileError::RemoteRejected`, state unchanged |
//! | network, 5xx, unknown payload | applied locally, `SyncOutcome::LocalFallback` |

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use slot_engine::ScheduledEvent;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::backend::{CalendarBackend, EventPatch};
use crate::error::{BackendError, ReconcileError, Result};
use crate::model::{
    Attendee, AttendeeRef, AttendeeStatus, BackendRef, Event, EventDraft, LocalId, NewAttendee,
    Provenance, RemoteId,
};
use crate::outcome::{Applied, SyncOutcome};
use crate::payload::{
    decode_attendee, decode_attendee_list, decode_event, decode_event_list, extract_id,
};
use crate::store::EventStore;

/// Result of listing events from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RefreshOutcome {
    Applied { events: usize },
    /// A newer listing was applied while this one was in flight.
    Superseded,
    /// The listing failed; the store is unchanged.
    Unavailable { reason: String },
}

pub struct EventReconciler<B> {
    backend: Arc<B>,
    store: Mutex<EventStore>,
    locks: Mutex<HashMap<LocalId, Arc<Mutex<()>>>>,
}

impl<B: CalendarBackend> EventReconciler<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            store: Mutex::new(EventStore::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn events(&self) -> Vec<Event> {
        self.store.lock().await.events().to_vec()
    }

    pub async fn get(&self, id: &LocalId) -> Option<Event> {
        self.store.lock().await.get(id).cloned()
    }

    /// The current events as the availability engine sees them.
    pub async fn scheduled_events(&self) -> Vec<ScheduledEvent> {
        self.store
            .lock()
            .await
            .events()
            .iter()
            .map(Event::as_scheduled)
            .collect()
    }

    pub async fn categories(&self) -> BTreeMap<String, bool> {
        self.store.lock().await.categories().clone()
    }

    pub async fn select_category(&self, category: &str, selected: bool) -> bool {
        self.store.lock().await.select_category(category, selected)
    }

    /// Store version; changes on every mutation.
    pub async fn version(&self) -> u64 {
        self.store.lock().await.version()
    }

    /// Number of per-event locks currently allocated.
    pub async fn tracked_locks(&self) -> usize {
        self.locks.lock().await.len()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Create an event, remotely if possible.
    ///
    /// # Errors
    /// Only draft validation fails. Any backend failure yields a local event.
    pub async fn create_event(&self, draft: EventDraft) -> Result<Applied<Event>> {
        draft.validate()?;

        debug!(title = %draft.title, "creating event remotely");
        let (event, sync) = match self.backend.create_event(&draft).await {
            Ok(payload) => match extract_id(&payload) {
                Some(remote) => {
                    let id = LocalId::from(&remote);
                    let provenance = Provenance::BackendConfirmed(BackendRef::Valid(remote));
                    (draft.into_event(id, provenance), SyncOutcome::Remote)
                }
                None => {
                    warn!("create response carried no event id; tracking as degraded");
                    let provenance = Provenance::BackendConfirmed(BackendRef::Degraded);
                    let event = draft.into_event(LocalId::generate_fallback(), provenance);
                    (event, SyncOutcome::Remote)
                }
            },
            Err(err) => {
                warn!(error = %err, "create failed; keeping event locally");
                let event = draft.into_event(LocalId::generate_local(), Provenance::Local);
                (event, SyncOutcome::fallback(err))
            }
        };

        self.store.lock().await.insert(event.clone());
        Ok(Applied::new(event, sync))
    }

    /// Flip an event's completed flag.
    ///
    /// A successful remote update is followed by a full refresh. Degraded events try
    /// their display id as the backend id before falling back.
    ///
    /// # Errors
    /// Returns `ReconcileError::UnknownEvent` if no event has this id, and
    /// `ReconcileError::RemoteRejected` when the backend refuses the update; the flag
    /// is left unchanged in that case.
    pub async fn toggle_completion(&self, id: &LocalId) -> Result<Applied<Event>> {
        let _guard = self.lock_event(id).await;
        let event = self.current(id).await?;
        let completed = !event.completed;

        let target = match &event.provenance {
            Provenance::Local => {
                let event = self.set_completed(id, completed).await?;
                return Ok(Applied::new(event, SyncOutcome::LocalOnly));
            }
            Provenance::BackendConfirmed(BackendRef::Valid(remote)) => Some(remote.clone()),
            Provenance::BackendConfirmed(BackendRef::Degraded) => {
                debug!(event = %id, "no backend id; trying display id");
                RemoteId::parse(id.as_str())
            }
        };
        let Some(target) = target else {
            let event = self.set_completed(id, completed).await?;
            return Ok(Applied::new(
                event,
                SyncOutcome::fallback("event has no usable backend id"),
            ));
        };

        debug!(event = %id, backend_id = %target, completed, "updating completion remotely");
        match self
            .backend
            .update_event(&target, &EventPatch::completed(completed))
            .await
        {
            Ok(_) => {
                let flipped = self.set_completed(id, completed).await?;
                if let RefreshOutcome::Unavailable { reason } = self.refresh().await {
                    debug!(event = %id, %reason, "refresh after update failed");
                }
                let event = self.get(id).await.unwrap_or(flipped);
                Ok(Applied::new(event, SyncOutcome::Remote))
            }
            Err(BackendError::Rejected { status, message }) => {
                Err(ReconcileError::RemoteRejected { status, message })
            }
            Err(err) => {
                warn!(event = %id, error = %err, "update failed; toggling locally");
                let event = self.set_completed(id, completed).await?;
                Ok(Applied::new(event, SyncOutcome::fallback(err)))
            }
        }
    }

    /// Delete an event. Deleting an unknown id is a no-op.
    ///
    /// # Errors
    /// Returns `ReconcileError::RemoteRejected` when the backend refuses the delete;
    /// the event is kept in that case.
    pub async fn delete_event(&self, id: &LocalId) -> Result<Applied<()>> {
        let guard = self.lock_event(id).await;
        let Some(event) = self.get(id).await else {
            return Ok(Applied::new((), SyncOutcome::Unchanged));
        };

        let sync = match event.backend_id() {
            None => SyncOutcome::LocalOnly,
            Some(remote) => {
                debug!(event = %id, backend_id = %remote, "deleting remotely");
                match self.backend.delete_event(remote).await {
                    Ok(_) | Err(BackendError::NotFound) => SyncOutcome::Remote,
                    Err(BackendError::Rejected { status, message }) => {
                        return Err(ReconcileError::RemoteRejected { status, message });
                    }
                    Err(err) => {
                        warn!(event = %id, error = %err, "delete failed; removing locally");
                        SyncOutcome::fallback(err)
                    }
                }
            }
        };

        self.store.lock().await.remove(id);
        drop(guard);
        self.locks.lock().await.remove(id);
        Ok(Applied::new((), sync))
    }

    /// Re-read one event from the backend, keeping its display id and attendees.
    ///
    /// # Errors
    /// Returns `ReconcileError::UnknownEvent` if the event is unknown locally, or was
    /// deleted on the backend (it is then removed locally too), and
    /// `ReconcileError::RemoteRejected` on a rejection.
    pub async fn reload_event(&self, id: &LocalId) -> Result<Applied<Event>> {
        let guard = self.lock_event(id).await;
        let event = self.current(id).await?;
        let Some(remote) = event.backend_id() else {
            return Ok(Applied::new(event, SyncOutcome::LocalOnly));
        };

        debug!(event = %id, backend_id = %remote, "reloading event");
        let fetched = self
            .backend
            .get_event(remote)
            .await
            .and_then(|payload| decode_event(&payload));
        match fetched {
            Ok(item) => {
                let mut store = self.store.lock().await;
                let event = store
                    .apply_remote(id, item)
                    .cloned()
                    .ok_or_else(|| ReconcileError::UnknownEvent(id.clone()))?;
                Ok(Applied::new(event, SyncOutcome::Remote))
            }
            Err(BackendError::NotFound) => {
                info!(event = %id, "event no longer exists on backend");
                self.store.lock().await.remove(id);
                drop(guard);
                self.locks.lock().await.remove(id);
                Err(ReconcileError::UnknownEvent(id.clone()))
            }
            Err(BackendError::Rejected { status, message }) => {
                Err(ReconcileError::RemoteRejected { status, message })
            }
            Err(err) => {
                warn!(event = %id, error = %err, "reload failed; keeping cached event");
                Ok(Applied::new(event, SyncOutcome::fallback(err)))
            }
        }
    }

    /// List events from the backend and reconcile them into the store.
    pub async fn refresh(&self) -> RefreshOutcome {
        let ticket = self.store.lock().await.begin_fetch();
        debug!("listing events");

        let listing = self
            .backend
            .list_events()
            .await
            .and_then(|payload| decode_event_list(&payload));
        let listing = match listing {
            Ok(listing) => listing,
            Err(err) => {
                warn!(error = %err, "event listing failed; keeping current events");
                return RefreshOutcome::Unavailable {
                    reason: err.to_string(),
                };
            }
        };

        let live: HashSet<LocalId> = {
            let mut store = self.store.lock().await;
            if !store.apply_fetch(ticket, listing) {
                return RefreshOutcome::Superseded;
            }
            info!(
                events = store.events().len(),
                version = store.version(),
                "applied event listing"
            );
            store.events().iter().map(|e| e.id.clone()).collect()
        };

        // Drop the locks of events the listing removed, unless an operation holds one.
        self.locks
            .lock()
            .await
            .retain(|id, lock| live.contains(id) || Arc::strong_count(lock) > 1);
        RefreshOutcome::Applied { events: live.len() }
    }

    // -----------------------------------------------------------------------
    // Attendees
    // -----------------------------------------------------------------------

    /// Fetch the authoritative attendee list and overwrite the cached one.
    ///
    /// Events without a backend id, and failed fetches, return the cached list.
    ///
    /// # Errors
    /// Returns `ReconcileError::UnknownEvent` if no event has this id.
    pub async fn fetch_attendees(&self, id: &LocalId) -> Result<Applied<Vec<Attendee>>> {
        let _guard = self.lock_event(id).await;
        let event = self.current(id).await?;
        let Some(remote) = event.backend_id() else {
            return Ok(Applied::new(event.attendees, SyncOutcome::LocalOnly));
        };

        match self.remote_attendees(&event.id, remote).await {
            Ok(attendees) => {
                self.store
                    .lock()
                    .await
                    .update(id, |e| e.attendees = attendees.clone());
                Ok(Applied::new(attendees, SyncOutcome::Remote))
            }
            Err(err) => {
                warn!(event = %id, error = %err, "attendee fetch failed; using cached list");
                Ok(Applied::new(event.attendees, SyncOutcome::fallback(err)))
            }
        }
    }

    /// Add an attendee, remotely when the event has a backend id.
    ///
    /// # Errors
    /// Returns `ReconcileError::Validation` for a malformed or duplicate email and
    /// `ReconcileError::UnknownEvent` if no event has this id.
    pub async fn add_attendee(&self, id: &LocalId, new: NewAttendee) -> Result<Applied<Attendee>> {
        new.validate()?;
        let _guard = self.lock_event(id).await;
        let event = self.current(id).await?;
        if event.attendees.iter().any(|a| a.has_email(&new.email)) {
            return Err(ReconcileError::Validation(format!(
                "{} is already attending",
                new.email.trim()
            )));
        }

        let local = || {
            Attendee::new(
                &event.id,
                None,
                new.name.trim().to_string(),
                new.email.trim().to_string(),
            )
        };
        let (attendee, sync) = match event.backend_id() {
            None => (local(), SyncOutcome::LocalOnly),
            Some(remote) => {
                debug!(event = %id, email = %new.email, "adding attendee remotely");
                match self.backend.add_attendee(remote, &new).await {
                    Ok(payload) => match decode_attendee(&payload, &event.id) {
                        Ok(attendee) => (attendee, SyncOutcome::Remote),
                        Err(err) => {
                            warn!(event = %id, error = %err, "attendee response undecodable");
                            (local(), SyncOutcome::Remote)
                        }
                    },
                    Err(err) => {
                        warn!(event = %id, error = %err, "add attendee failed; adding locally");
                        (local(), SyncOutcome::fallback(err))
                    }
                }
            }
        };

        self.store
            .lock()
            .await
            .update(id, |e| e.attendees.push(attendee.clone()));
        Ok(Applied::new(attendee, sync))
    }

    /// Remove an attendee by backend id or email.
    ///
    /// Removing an attendee that is not on the list is a no-op.
    ///
    /// # Errors
    /// Returns `ReconcileError::RemoteRejected` for a 4xx other than 404, leaving the
    /// list unchanged, and `ReconcileError::UnknownEvent` if no event has this id.
    pub async fn remove_attendee(&self, id: &LocalId, attendee: AttendeeRef) -> Result<Applied<()>> {
        let _guard = self.lock_event(id).await;
        let event = self.current(id).await?;
        let resolved = self.resolve_attendee(&event, &attendee).await;

        let sync = match (event.backend_id(), &resolved) {
            (Some(remote), Some(attendee_id)) => {
                debug!(event = %id, attendee = %attendee_id, "removing attendee remotely");
                match self.backend.remove_attendee(remote, attendee_id).await {
                    Ok(_) => SyncOutcome::Remote,
                    Err(BackendError::NotFound) => {
                        debug!(event = %id, attendee = %attendee_id, "attendee already gone");
                        SyncOutcome::Remote
                    }
                    Err(BackendError::Rejected { status, message }) => {
                        return Err(ReconcileError::RemoteRejected { status, message });
                    }
                    Err(err) => {
                        warn!(event = %id, error = %err, "remove attendee failed; local only");
                        SyncOutcome::fallback(err)
                    }
                }
            }
            _ => SyncOutcome::LocalOnly,
        };

        let removed = self
            .store
            .lock()
            .await
            .update(id, |e| {
                let before = e.attendees.len();
                e.attendees
                    .retain(|a| !attendee.matches(a) && (resolved.is_none() || a.id != resolved));
                before - e.attendees.len()
            })
            .unwrap_or(0);

        if removed == 0 && sync == SyncOutcome::LocalOnly {
            return Ok(Applied::new((), SyncOutcome::Unchanged));
        }
        Ok(Applied::new((), sync))
    }

    /// Set an attendee's response status.
    ///
    /// # Errors
    /// Returns `ReconcileError::UnknownAttendee` when the attendee is not on the list or
    /// no longer exists on the backend, and `ReconcileError::RemoteRejected` for other
    /// 4xx responses. The list is unchanged in both cases.
    pub async fn update_attendee_status(
        &self,
        id: &LocalId,
        attendee: AttendeeRef,
        status: AttendeeStatus,
    ) -> Result<Applied<Attendee>> {
        let _guard = self.lock_event(id).await;
        let event = self.current(id).await?;
        if !event.attendees.iter().any(|a| attendee.matches(a)) {
            return Err(ReconcileError::UnknownAttendee(attendee.to_string()));
        }
        let resolved = self.resolve_attendee(&event, &attendee).await;

        let sync = match (event.backend_id(), &resolved) {
            (Some(remote), Some(attendee_id)) => {
                debug!(event = %id, attendee = %attendee_id, ?status, "updating attendee status");
                match self
                    .backend
                    .update_attendee_status(remote, attendee_id, status)
                    .await
                {
                    Ok(_) => SyncOutcome::Remote,
                    Err(BackendError::NotFound) => {
                        return Err(ReconcileError::UnknownAttendee(attendee.to_string()));
                    }
                    Err(BackendError::Rejected { status, message }) => {
                        return Err(ReconcileError::RemoteRejected { status, message });
                    }
                    Err(err) => {
                        warn!(event = %id, error = %err, "status update failed; local only");
                        SyncOutcome::fallback(err)
                    }
                }
            }
            _ => SyncOutcome::LocalOnly,
        };

        let updated = self
            .store
            .lock()
            .await
            .update(id, |e| {
                let found = e.attendees.iter_mut().find(|a| attendee.matches(a))?;
                found.status = status;
                if found.id.is_none() {
                    if let Some(attendee_id) = &resolved {
                        found.id = Some(attendee_id.clone());
                    }
                }
                Some(found.clone())
            })
            .flatten()
            .ok_or_else(|| ReconcileError::UnknownAttendee(attendee.to_string()))?;
        Ok(Applied::new(updated, sync))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn lock_event(&self, id: &LocalId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    async fn current(&self, id: &LocalId) -> Result<Event> {
        self.get(id)
            .await
            .ok_or_else(|| ReconcileError::UnknownEvent(id.clone()))
    }

    async fn set_completed(&self, id: &LocalId, completed: bool) -> Result<Event> {
        self.store
            .lock()
            .await
            .update(id, |e| {
                e.completed = completed;
                e.clone()
            })
            .ok_or_else(|| ReconcileError::UnknownEvent(id.clone()))
    }

    async fn remote_attendees(
        &self,
        event: &LocalId,
        remote: &RemoteId,
    ) -> std::result::Result<Vec<Attendee>, BackendError> {
        debug!(event = %event, backend_id = %remote, "fetching attendees");
        let payload = self.backend.get_attendees(remote).await?;
        decode_attendee_list(&payload, event)
    }

    /// Find the backend id of an attendee: the reference itself, the cached list, then
    /// a fresh fetch. `None` means the attendee can only be handled locally.
    async fn resolve_attendee(&self, event: &Event, attendee: &AttendeeRef) -> Option<RemoteId> {
        let email = match attendee {
            AttendeeRef::Id(id) => return Some(id.clone()),
            AttendeeRef::Email(email) => email,
        };
        if let Some(id) = event
            .attendees
            .iter()
            .find(|a| a.has_email(email))
            .and_then(|a| a.id.clone())
        {
            return Some(id);
        }

        let remote = event.backend_id()?;
        match self.remote_attendees(&event.id, remote).await {
            Ok(fresh) => fresh
                .into_iter()
                .find(|a| a.has_email(email))
                .and_then(|a| a.id),
            Err(err) => {
                debug!(event = %event.id, error = %err, "could not resolve attendee id");
                None
            }
        }
    }
}
