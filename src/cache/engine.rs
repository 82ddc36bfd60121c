//! Artifact Cache Engine
//!
//! Ties the store, admission policy, coordinator and producers together
//! behind the two calls the rest of the service uses: `fetch` and `invalidate`.
//! The sweeper refreshes entries through `refresh`, which shares the
//! coordinator with the miss path.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{
    Acquired, AdmissionPolicy, CacheEntry, CacheKey, CacheStats, CacheStore, EntryState,
    FlightGuard, FlightResult, ProducerRecipe, ProducerRegistry, RecomputeCoordinator,
    SetOutcome, StatsRecorder, DEFAULT_UNCACHED_VIEWS,
};
use crate::error::{CacheError, ProducerError, Result};

// == Cache Settings ==
/// Tuning knobs for the engine.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Maximum resident entries
    pub capacity: usize,
    /// Lifetime of a freshly produced entry
    pub refresh_interval: Duration,
    /// Entries this close to expiry are refreshed by the sweeper
    pub refresh_lookahead: Duration,
    /// Bound on waiting for another caller's recompute
    pub recompute_timeout: Duration,
    /// Deadline for one producer invocation
    pub producer_timeout: Duration,
    /// Admission threshold on page number
    pub cacheable_page_depth: u32,
    /// Views never admitted regardless of depth
    pub uncached_views: Vec<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            refresh_interval: Duration::from_secs(30),
            refresh_lookahead: Duration::from_secs(1),
            recompute_timeout: Duration::from_secs(2),
            producer_timeout: Duration::from_secs(5),
            cacheable_page_depth: 5,
            uncached_views: DEFAULT_UNCACHED_VIEWS.iter().map(|v| v.to_string()).collect(),
        }
    }
}

// == Refresh Outcome ==
/// Result of a background refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New value stored with an advanced expiry
    Refreshed,
    /// Another recompute held the key, or the key was invalidated meanwhile
    Skipped,
    /// Producer failed; the resident entry is untouched
    Failed(ProducerError),
}

// == Entry Info ==
/// Inspectable view of a resident entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub recipe: ProducerRecipe,
    pub state: EntryState,
    pub size_bytes: usize,
    pub age_ms: u64,
    pub ttl_remaining_ms: u64,
}

// == Artifact Cache ==
/// Self-refreshing, capacity-bounded cache of produced artifacts.
///
/// One instance is built at startup and shared as `Arc<ArtifactCache>`.
#[derive(Debug)]
pub struct ArtifactCache {
    store: CacheStore,
    coordinator: RecomputeCoordinator,
    admission: AdmissionPolicy,
    producers: ProducerRegistry,
    stats: StatsRecorder,
    settings: CacheSettings,
}

impl ArtifactCache {
    // == Constructor ==
    pub fn new(settings: CacheSettings, producers: ProducerRegistry) -> Self {
        Self {
            store: CacheStore::new(settings.capacity),
            coordinator: RecomputeCoordinator::new(),
            admission: AdmissionPolicy::new(settings.cacheable_page_depth, &settings.uncached_views),
            producers,
            stats: StatsRecorder::new(),
            settings,
        }
    }

    /// Convenience constructor returning the shared handle.
    pub fn shared(settings: CacheSettings, producers: ProducerRegistry) -> Arc<Self> {
        Arc::new(Self::new(settings, producers))
    }

    // == Fetch ==
    /// Returns the artifact for `key`.
    ///
    /// Cacheable keys are served from the store when fresh; a miss is
    /// recomputed once no matter how many callers are waiting. Keys the
    /// admission policy refuses are produced directly on every call.
    pub async fn fetch(&self, key: &CacheKey) -> Result<Bytes> {
        if !self.admission.is_cacheable(key) {
            self.stats.record_bypass();
            debug!(key = %key, "Not cacheable, producing directly");
            return Ok(self.produce(key, &ProducerRecipe::for_key(key)).await?);
        }

        if let Some(value) = self.store.get(key.as_str()) {
            self.stats.record_hit();
            debug!(key = %key, "Cache hit");
            return Ok(value);
        }
        self.stats.record_miss();

        let deadline = Instant::now() + self.settings.recompute_timeout;
        loop {
            match self.coordinator.acquire(key.as_str()) {
                Acquired::Leader(guard) => {
                    // A flight may have landed between the miss and the claim
                    if let Some(value) = self.store.get(key.as_str()) {
                        guard.complete(Ok(value.clone()));
                        return Ok(value);
                    }
                    return self.recompute(key, guard).await;
                }
                Acquired::Follower(waiter) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match waiter.wait(remaining).await {
                        FlightResult::Completed(Ok(value)) => return Ok(value),
                        FlightResult::Completed(Err(err)) => return self.stale_or(key, err),
                        FlightResult::Abandoned => {
                            debug!(key = %key, "In-flight recompute abandoned, retrying");
                            continue;
                        }
                        FlightResult::TimedOut => return self.timeout_fallback(key).await,
                    }
                }
            }
        }
    }

    // == Invalidate ==
    /// Drops the entry for `key` so the next fetch recomputes it.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.store.remove(key.as_str());
        if removed {
            info!(key = %key, "Entry invalidated");
        }
        removed
    }

    // == Refresh ==
    /// Recomputes `entry` ahead of its expiry.
    ///
    /// Goes through the coordinator, so it never overlaps a miss-path recompute
    /// of the same key. A failure leaves the resident entry and its expiry as
    /// they were; the next sweep tries again.
    pub async fn refresh(&self, entry: &CacheEntry) -> RefreshOutcome {
        let guard = match self.coordinator.acquire(entry.key.as_str()) {
            Acquired::Leader(guard) => guard,
            Acquired::Follower(_) => {
                debug!(key = %entry.key, "Refresh skipped, already in flight");
                return RefreshOutcome::Skipped;
            }
        };

        match self.produce(&entry.key, &entry.recipe).await {
            Ok(value) => {
                let outcome = self.store.replace(entry.refreshed(value.clone()));
                guard.complete(Ok(value));
                match outcome {
                    Some(SetOutcome::Replaced) => {
                        self.stats.record_refresh();
                        debug!(key = %entry.key, "Entry refreshed");
                        RefreshOutcome::Refreshed
                    }
                    _ => {
                        debug!(key = %entry.key, "Refreshed value discarded");
                        RefreshOutcome::Skipped
                    }
                }
            }
            Err(err) => {
                self.stats.record_refresh_failure();
                warn!(key = %entry.key, error = %err, "Refresh failed, keeping current entry");
                guard.complete(Err(err.clone()));
                RefreshOutcome::Failed(err)
            }
        }
    }

    // == Inspection ==
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(
            self.store.count(),
            self.store.capacity(),
            self.coordinator.in_flight(),
        )
    }

    /// Resident entries, sorted by key.
    pub fn entries(&self) -> Vec<EntryInfo> {
        let lookahead = self.settings.refresh_lookahead;
        let mut entries: Vec<EntryInfo> = self
            .store
            .snapshot()
            .iter()
            .map(|entry| EntryInfo {
                key: entry.key.to_string(),
                recipe: entry.recipe.clone(),
                state: entry.state(lookahead),
                size_bytes: entry.value.len(),
                age_ms: entry.age().as_millis() as u64,
                ttl_remaining_ms: entry.ttl_remaining().as_millis() as u64,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Entries whose expiry falls within the refresh lookahead (or has passed).
    pub fn due_for_refresh(&self) -> Vec<Arc<CacheEntry>> {
        let lookahead = self.settings.refresh_lookahead;
        self.store
            .snapshot()
            .into_iter()
            .filter(|entry| entry.needs_refresh(lookahead))
            .collect()
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn admission(&self) -> &AdmissionPolicy {
        &self.admission
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    // == Shutdown ==
    /// Releases every resident entry.
    pub fn shutdown(&self) -> usize {
        let released = self.store.clear();
        info!("Cache shut down, released {} entries", released);
        released
    }

    // == Internals ==

    async fn produce(&self, key: &CacheKey, recipe: &ProducerRecipe) -> std::result::Result<Bytes, ProducerError> {
        let producer = self.producers.get(&recipe.producer)?;
        self.stats.record_producer_call();

        let deadline = self.settings.producer_timeout;
        match tokio::time::timeout(deadline, producer.produce(key, &recipe.args)).await {
            Ok(result) => result,
            Err(_) => Err(ProducerError::DeadlineExceeded(deadline)),
        }
    }

    /// Leader path of a miss: produce, store, publish.
    async fn recompute(&self, key: &CacheKey, guard: FlightGuard) -> Result<Bytes> {
        let recipe = ProducerRecipe::for_key(key);
        match self.produce(key, &recipe).await {
            Ok(value) => {
                let entry = CacheEntry::new(
                    key.clone(),
                    value.clone(),
                    recipe,
                    self.settings.refresh_interval,
                );
                self.admit(entry);
                guard.complete(Ok(value.clone()));
                Ok(value)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Recompute failed");
                guard.complete(Err(err.clone()));
                self.stale_or(key, err)
            }
        }
    }

    /// Stores a freshly produced entry. Never fails the request: a full store
    /// just means this value is served uncached.
    fn admit(&self, entry: CacheEntry) {
        let key = entry.key.clone();
        match self.store.set(entry) {
            Ok(outcome) => debug!(key = %key, ?outcome, "Entry stored"),
            Err(CacheError::CapacityExceeded(_)) => {
                self.stats.record_capacity_rejection();
                warn!(
                    key = %key,
                    capacity = self.store.capacity(),
                    "Cache at capacity, serving uncached"
                );
            }
            Err(err) => warn!(key = %key, error = %err, "Entry not stored, serving uncached"),
        }
    }

    /// Redundant direct computation after waiting too long on another caller.
    async fn timeout_fallback(&self, key: &CacheKey) -> Result<Bytes> {
        self.stats.record_timeout_fallback();
        warn!(
            key = %key,
            timeout_ms = self.settings.recompute_timeout.as_millis() as u64,
            "{}, producing directly",
            CacheError::RecomputeTimeout(key.to_string())
        );
        match self.produce(key, &ProducerRecipe::for_key(key)).await {
            Ok(value) => Ok(value),
            Err(err) => self.stale_or(key, err),
        }
    }

    /// Serves the last good value if one is resident, otherwise surfaces `err`.
    fn stale_or(&self, key: &CacheKey, err: ProducerError) -> Result<Bytes> {
        match self.store.get_stale(key.as_str()) {
            Some(entry) => {
                self.stats.record_stale_served();
                warn!(key = %key, error = %err, "Serving stale entry");
                Ok(entry.value.clone())
            }
            None => Err(err.into()),
        }
    }
}
