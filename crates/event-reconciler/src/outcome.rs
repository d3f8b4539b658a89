//! Soft-notification channel for operations that may fall back to local state.

use serde::Serialize;

/// How an operation's effect reached the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SyncOutcome {
    /// The backend accepted the change.
    Remote,
    /// The change applies to local-only state; no remote call was due.
    LocalOnly,
    /// A remote call was due but failed transiently; the change was applied locally.
    LocalFallback { reason: String },
    /// Nothing to do, e.g. deleting an event that is already gone.
    Unchanged,
}

impl SyncOutcome {
    pub fn fallback(reason: impl ToString) -> Self {
        SyncOutcome::LocalFallback {
            reason: reason.to_string(),
        }
    }

    /// True when the UI should show a non-blocking "saved locally" notice.
    pub fn needs_notice(&self) -> bool {
        matches!(self, SyncOutcome::LocalFallback { .. })
    }
}

/// A successfully applied operation together with how it was synchronized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Applied<T> {
    pub value: T,
    pub sync: SyncOutcome,
}

impl<T> Applied<T> {
    pub fn new(value: T, sync: SyncOutcome) -> Self {
        Self { value, sync }
    }
}
