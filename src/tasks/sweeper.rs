//! Refresh Sweeper Task
//!
//! Background task that recomputes entries shortly before they expire, so a
//! warm key never turns into a synchronous miss.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::{ArtifactCache, RefreshOutcome};

// == Sweeper ==
/// Periodic scanner dispatching proactive refreshes.
#[derive(Debug, Clone)]
pub struct Sweeper {
    cache: Arc<ArtifactCache>,
    tick: Duration,
}

impl Sweeper {
    pub fn new(cache: Arc<ArtifactCache>, tick: Duration) -> Self {
        Self { cache, tick }
    }

    // == Sweep Once ==
    /// Scans a snapshot of the store and spawns one refresh per entry that is
    /// within the lookahead window or already stale.
    ///
    /// Refreshes run concurrently; a slow producer for one key does not hold
    /// up the others. The handles are returned for callers that want to await
    /// the round; the background loop ignores them.
    pub fn sweep_once(&self) -> Vec<JoinHandle<RefreshOutcome>> {
        self.cache
            .due_for_refresh()
            .into_iter()
            .map(|entry| {
                let cache = Arc::clone(&self.cache);
                tokio::spawn(async move { cache.refresh(&entry).await })
            })
            .collect()
    }

    // == Spawn ==
    /// Runs the sweeper until the returned handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Starting refresh sweeper with tick of {}ms",
                self.tick.as_millis()
            );

            let mut ticker = tokio::time::interval(self.tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let dispatched = self.sweep_once().len();
                if dispatched > 0 {
                    debug!("Sweep: dispatched {} refreshes", dispatched);
                }
            }
        })
    }
}

/// Spawns the background sweeper for `cache`.
///
/// # Example
/// ```ignore
/// let cache = ArtifactCache::shared(settings, producers);
/// let sweeper_handle = spawn_sweeper_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweeper_handle.abort();
/// ```
pub fn spawn_sweeper_task(cache: Arc<ArtifactCache>, tick: Duration) -> JoinHandle<()> {
    Sweeper::new(cache, tick).spawn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{producer_fn, CacheKey, CacheSettings, ProducerRegistry};
    use crate::error::ProducerError;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache_with(calls: Arc<AtomicUsize>, failing: &'static str) -> Arc<ArtifactCache> {
        let mut registry = ProducerRegistry::new();
        registry.register(
            "home",
            producer_fn(move |key: CacheKey, _| {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if key.as_str() == failing && n > 0 {
                        return Err(ProducerError::failed("boom"));
                    }
                    Ok(Bytes::from(format!("v{}", n)))
                }
            }),
        );
        let settings = CacheSettings {
            refresh_interval: Duration::from_secs(10),
            refresh_lookahead: Duration::from_secs(1),
            ..CacheSettings::default()
        };
        ArtifactCache::shared(settings, registry)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_ignores_fresh_entries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache_with(calls.clone(), "");
        cache.fetch(&CacheKey::new("home", "fi", None, 0)).await.unwrap();

        let sweeper = Sweeper::new(cache, Duration::from_secs(1));
        assert!(sweeper.sweep_once().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_refreshes_entries_nearing_expiry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache_with(calls.clone(), "");
        let key = CacheKey::new("home", "fi", None, 0);
        cache.fetch(&key).await.unwrap();
        let before = cache.store().get_stale(key.as_str()).unwrap();

        tokio::time::advance(Duration::from_millis(9_200)).await;
        let sweeper = Sweeper::new(cache.clone(), Duration::from_secs(1));
        let handles = sweeper.sweep_once();
        assert_eq!(handles.len(), 1);
        for handle in handles {
            assert_eq!(handle.await.unwrap(), RefreshOutcome::Refreshed);
        }

        let after = cache.store().get_stale(key.as_str()).unwrap();
        assert!(after.expires_at > before.expires_at);
        assert_eq!(cache.fetch(&key).await.unwrap(), Bytes::from_static(b"v1"));
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_key_does_not_block_others() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache_with(calls.clone(), "home_fi_0");
        cache.fetch(&CacheKey::new("home", "fi", None, 0)).await.unwrap();
        cache.fetch(&CacheKey::new("home", "en", None, 0)).await.unwrap();

        tokio::time::advance(Duration::from_millis(9_500)).await;
        let sweeper = Sweeper::new(cache.clone(), Duration::from_secs(1));
        let mut outcomes = Vec::new();
        for handle in sweeper.sweep_once() {
            outcomes.push(handle.await.unwrap());
        }

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&RefreshOutcome::Refreshed));
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, RefreshOutcome::Failed(_))));
        assert_eq!(cache.stats().refreshes, 1);
        assert_eq!(cache.stats().refresh_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_keeps_key_warm() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache_with(calls.clone(), "");
        let key = CacheKey::new("home", "fi", None, 0);
        cache.fetch(&key).await.unwrap();

        let handle = spawn_sweeper_task(cache.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(35)).await;

        // Three refreshes happened and no request ever missed again
        assert!(calls.load(Ordering::SeqCst) >= 4);
        assert!(cache.fetch(&key).await.is_ok());
        assert_eq!(cache.stats().misses, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_task_can_be_aborted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = spawn_sweeper_task(cache_with(calls, ""), Duration::from_secs(1));

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
