//! Cached availability checks with a local fallback.
//!
//! The service remembers the last query and its snapshot. A repeated query within the
//! TTL is answered from memory, without a backend call or a local computation. On a
//! miss the backend is asked first; if it is unreachable or answers in an unknown
//! shape, the snapshot is computed locally from the caller's events. Local snapshots
//! are cached like backend ones and keep their [`SnapshotSource`].
//!
//! Each miss takes a request generation. A response that comes back after a newer
//! request was issued is discarded as [`FetchOutcome::Superseded`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use slot_engine::config::parse_timezone;
use slot_engine::{AvailabilityEngine, AvailabilitySnapshot, ScheduledEvent};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::backend::{AvailabilityQuery, CalendarBackend};
use crate::payload::decode_snapshot;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// How long a backend snapshot is reused for an identical query.
    pub cache_ttl_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl ServiceConfig {
    pub fn cache_ttl(&self) -> Duration {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

/// Source of the current time, replaceable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    query: AvailabilityQuery,
    snapshot: AvailabilitySnapshot,
    source: SnapshotSource,
    stored_at: DateTime<Utc>,
}

/// Single-entry, last-write-wins snapshot cache.
#[derive(Debug, Clone)]
pub struct AvailabilityCache {
    ttl: Duration,
    entry: Option<CacheEntry>,
}

impl AvailabilityCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// The cached snapshot and its source, if stored for exactly `query` less than a TTL
    /// ago.
    pub fn lookup(
        &self,
        query: &AvailabilityQuery,
        now: DateTime<Utc>,
    ) -> Option<(&AvailabilitySnapshot, &SnapshotSource)> {
        self.entry
            .as_ref()
            .filter(|entry| &entry.query == query && now - entry.stored_at < self.ttl)
            .map(|entry| (&entry.snapshot, &entry.source))
    }

    pub fn store(
        &mut self,
        query: AvailabilityQuery,
        snapshot: AvailabilitySnapshot,
        source: SnapshotSource,
        now: DateTime<Utc>,
    ) {
        self.entry = Some(CacheEntry {
            query,
            snapshot,
            source,
            stored_at: now,
        });
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

/// Where a freshly obtained snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SnapshotSource {
    Backend,
    /// Computed locally because the backend could not provide one.
    LocalFallback { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Cached {
        snapshot: AvailabilitySnapshot,
        source: SnapshotSource,
    },
    Fresh {
        snapshot: AvailabilitySnapshot,
        source: SnapshotSource,
    },
    /// A newer request was issued while this one was in flight.
    Superseded,
}

impl FetchOutcome {
    pub fn snapshot(&self) -> Option<&AvailabilitySnapshot> {
        match self {
            FetchOutcome::Cached { snapshot, .. } | FetchOutcome::Fresh { snapshot, .. } => {
                Some(snapshot)
            }
            FetchOutcome::Superseded => None,
        }
    }

    pub fn into_snapshot(self) -> Option<AvailabilitySnapshot> {
        match self {
            FetchOutcome::Cached { snapshot, .. } | FetchOutcome::Fresh { snapshot, .. } => {
                Some(snapshot)
            }
            FetchOutcome::Superseded => None,
        }
    }
}

pub struct AvailabilityService<B> {
    backend: Arc<B>,
    engine: AvailabilityEngine,
    clock: Arc<dyn Clock>,
    cache: Mutex<AvailabilityCache>,
    generation: AtomicU64,
}

impl<B: CalendarBackend> AvailabilityService<B> {
    pub fn new(backend: Arc<B>, engine: AvailabilityEngine, config: &ServiceConfig) -> Self {
        Self::with_clock(backend, engine, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        backend: Arc<B>,
        engine: AvailabilityEngine,
        config: &ServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            engine,
            clock,
            cache: Mutex::new(AvailabilityCache::new(config.cache_ttl())),
            generation: AtomicU64::new(0),
        }
    }

    /// Availability for `query`. `events` feed the local fallback computation.
    pub async fn check_availability(
        &self,
        query: &AvailabilityQuery,
        events: &[ScheduledEvent],
    ) -> FetchOutcome {
        let now = self.clock.now();
        if let Some((snapshot, source)) = self.cache.lock().await.lookup(query, now) {
            debug!(start = %query.start_date, end = %query.end_date, "availability cache hit");
            return FetchOutcome::Cached {
                snapshot: snapshot.clone(),
                source: source.clone(),
            };
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, timezone = %query.timezone, "requesting availability");

        let fetched = self
            .backend
            .get_availability(query)
            .await
            .and_then(|payload| decode_snapshot(&payload));

        let mut cache = self.cache.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "discarding superseded availability response");
            return FetchOutcome::Superseded;
        }

        let (snapshot, source) = match fetched {
            Ok(snapshot) => (snapshot, SnapshotSource::Backend),
            Err(err) => {
                warn!(error = %err, "availability backend failed; computing locally");
                let reason = err.to_string();
                (
                    self.local_snapshot(query, events),
                    SnapshotSource::LocalFallback { reason },
                )
            }
        };
        cache.store(
            query.clone(),
            snapshot.clone(),
            source.clone(),
            self.clock.now(),
        );
        FetchOutcome::Fresh { snapshot, source }
    }

    /// Drop the cached snapshot, e.g. after the event list changed.
    pub async fn invalidate(&self) {
        self.cache.lock().await.clear();
    }

    /// Compute with the service's rules in the query's timezone, when it is valid.
    fn local_snapshot(
        &self,
        query: &AvailabilityQuery,
        events: &[ScheduledEvent],
    ) -> AvailabilitySnapshot {
        let engine = match parse_timezone(&query.timezone) {
            Ok(timezone) => {
                let mut config = self.engine.config().clone();
                config.timezone = timezone;
                AvailabilityEngine::from_config(config).unwrap_or_else(|_| self.engine.clone())
            }
            Err(err) => {
                debug!(error = %err, "using configured timezone for local availability");
                self.engine.clone()
            }
        };
        engine.compute_availability(query.start_date, query.end_date, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use slot_engine::compute_availability;

    fn query(day: u32) -> AvailabilityQuery {
        let date = NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        AvailabilityQuery::new(date, date, "UTC")
    }

    #[test]
    fn cache_hit_requires_identical_query_within_ttl() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut cache = AvailabilityCache::new(Duration::minutes(5));
        let snapshot = compute_availability(query(3).start_date, query(3).end_date, &[]);
        cache.store(query(3), snapshot, SnapshotSource::Backend, t0);

        assert!(cache.lookup(&query(3), t0 + Duration::minutes(4)).is_some());
        assert!(cache.lookup(&query(4), t0).is_none());
        assert!(cache.lookup(&query(3), t0 + Duration::minutes(5)).is_none());
    }

    #[test]
    fn default_ttl_is_five_minutes() {
        assert_eq!(ServiceConfig::default().cache_ttl(), Duration::minutes(5));
        let parsed: ServiceConfig = toml::from_str("cache_ttl_secs = 60").unwrap();
        assert_eq!(parsed.cache_ttl(), Duration::seconds(60));
    }
}
