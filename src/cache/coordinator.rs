//! Recompute Coordinator Module
//!
//! At most one producer invocation in flight per key. The first caller to
//! claim a key leads the recompute; everyone else subscribes to its outcome
//! and is woken when it is published.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use crate::error::ProducerError;

/// Result a leader publishes to its followers.
pub type FlightOutcome = std::result::Result<Bytes, ProducerError>;

type FlightMap = Arc<DashMap<String, Arc<Flight>>>;

struct Flight {
    outcome: watch::Sender<Option<FlightOutcome>>,
}

// == Acquired ==
/// Role handed out by [`RecomputeCoordinator::acquire`].
pub enum Acquired {
    /// Caller owns the recompute and must complete (or drop) the guard
    Leader(FlightGuard),
    /// Another caller is already recomputing this key
    Follower(FlightWaiter),
}

// == Flight Result ==
/// What a follower observed while waiting.
#[derive(Debug)]
pub enum FlightResult {
    /// The leader published an outcome
    Completed(FlightOutcome),
    /// The leader went away without publishing (cancelled task)
    Abandoned,
    /// The wait bound elapsed first
    TimedOut,
}

// == Recompute Coordinator ==
/// Per-key in-flight markers.
#[derive(Default)]
pub struct RecomputeCoordinator {
    flights: FlightMap,
}

impl RecomputeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    // == Acquire ==
    /// Claims the in-flight marker for `key`, or joins the flight already holding it.
    ///
    /// The claim is a single insert into a vacant map slot, so two callers can
    /// never both become leader for the same key.
    pub fn acquire(&self, key: &str) -> Acquired {
        match self.flights.entry(key.to_owned()) {
            Entry::Occupied(occupied) => Acquired::Follower(FlightWaiter {
                key: key.to_owned(),
                outcome: occupied.get().outcome.subscribe(),
            }),
            Entry::Vacant(vacant) => {
                let (tx, _) = watch::channel(None);
                let flight = Arc::new(Flight { outcome: tx });
                vacant.insert(Arc::clone(&flight));
                debug!(key, "Recompute claimed");
                Acquired::Leader(FlightGuard {
                    key: key.to_owned(),
                    flight,
                    flights: Arc::clone(&self.flights),
                })
            }
        }
    }

    /// Number of keys currently being recomputed.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.flights.contains_key(key)
    }
}

impl std::fmt::Debug for RecomputeCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecomputeCoordinator")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

// == Flight Guard ==
/// Ownership of a key's recompute. Dropping it releases the marker.
pub struct FlightGuard {
    key: String,
    flight: Arc<Flight>,
    flights: FlightMap,
}

impl FlightGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Publishes the outcome to every follower and releases the marker.
    ///
    /// Callers write the store before completing, so a follower that re-reads
    /// the store after waking sees the new entry.
    pub fn complete(self, outcome: FlightOutcome) {
        self.flight.outcome.send_replace(Some(outcome));
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let flight = &self.flight;
        self.flights
            .remove_if(&self.key, |_, current| Arc::ptr_eq(current, flight));
        debug!(key = %self.key, "Recompute released");
    }
}

// == Flight Waiter ==
/// Subscription to another caller's recompute.
pub struct FlightWaiter {
    key: String,
    outcome: watch::Receiver<Option<FlightOutcome>>,
}

impl FlightWaiter {
    pub fn key(&self) -> &str {
        &self.key
    }

    // == Wait ==
    /// Waits at most `timeout` for the leader's outcome.
    pub async fn wait(mut self, timeout: Duration) -> FlightResult {
        let waited = tokio::time::timeout(timeout, self.outcome.wait_for(Option::is_some)).await;
        match waited {
            Err(_) => FlightResult::TimedOut,
            Ok(Err(_)) => FlightResult::Abandoned,
            Ok(Ok(published)) => match published.clone() {
                Some(outcome) => FlightResult::Completed(outcome),
                None => FlightResult::Abandoned,
            },
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn leader(acquired: Acquired) -> FlightGuard {
        match acquired {
            Acquired::Leader(guard) => guard,
            Acquired::Follower(_) => panic!("expected leader"),
        }
    }

    fn follower(acquired: Acquired) -> FlightWaiter {
        match acquired {
            Acquired::Follower(waiter) => waiter,
            Acquired::Leader(_) => panic!("expected follower"),
        }
    }

    #[tokio::test]
    async fn test_first_caller_leads() {
        let coordinator = RecomputeCoordinator::new();

        let guard = leader(coordinator.acquire("home_fi_0"));
        assert_eq!(guard.key(), "home_fi_0");
        assert!(coordinator.is_in_flight("home_fi_0"));

        let waiter = follower(coordinator.acquire("home_fi_0"));
        assert_eq!(waiter.key(), "home_fi_0");

        // Other keys are independent
        let _other = leader(coordinator.acquire("home_en_0"));
        assert_eq!(coordinator.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_follower_receives_outcome() {
        let coordinator = RecomputeCoordinator::new();
        let guard = leader(coordinator.acquire("k"));
        let waiter = follower(coordinator.acquire("k"));

        let wait = tokio::spawn(waiter.wait(Duration::from_secs(5)));
        guard.complete(Ok(Bytes::from_static(b"fresh")));

        match wait.await.unwrap() {
            FlightResult::Completed(Ok(value)) => assert_eq!(value, Bytes::from_static(b"fresh")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_follower_pending_until_published() {
        let coordinator = RecomputeCoordinator::new();
        let guard = leader(coordinator.acquire("k"));
        let waiter = follower(coordinator.acquire("k"));

        let mut wait = tokio_test::task::spawn(waiter.wait(Duration::from_secs(5)));
        tokio_test::assert_pending!(wait.poll());

        guard.complete(Ok(Bytes::from_static(b"v")));
        assert!(wait.is_woken());
        match tokio_test::assert_ready!(wait.poll()) {
            FlightResult::Completed(Ok(value)) => assert_eq!(value, Bytes::from_static(b"v")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_follower_receives_error() {
        let coordinator = RecomputeCoordinator::new();
        let guard = leader(coordinator.acquire("k"));
        let waiter = follower(coordinator.acquire("k"));

        guard.complete(Err(ProducerError::failed("store down")));

        assert!(matches!(
            waiter.wait(Duration::from_secs(1)).await,
            FlightResult::Completed(Err(ProducerError::Failed(_)))
        ));
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_marker() {
        let coordinator = RecomputeCoordinator::new();
        let guard = leader(coordinator.acquire("k"));
        let waiter = follower(coordinator.acquire("k"));

        drop(guard);

        assert!(matches!(
            waiter.wait(Duration::from_secs(1)).await,
            FlightResult::Abandoned
        ));
        assert!(!coordinator.is_in_flight("k"));
        // The key can be claimed again
        let _guard = leader(coordinator.acquire("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_bounded() {
        let coordinator = RecomputeCoordinator::new();
        let _guard = leader(coordinator.acquire("k"));
        let waiter = follower(coordinator.acquire("k"));

        let started = tokio::time::Instant::now();
        assert!(matches!(
            waiter.wait(Duration::from_millis(200)).await,
            FlightResult::TimedOut
        ));
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_late_follower_sees_published_outcome() {
        let coordinator = Arc::new(RecomputeCoordinator::new());
        let guard = leader(coordinator.acquire("k"));

        // Subscribe, then publish before the follower starts waiting
        let waiter = follower(coordinator.acquire("k"));
        guard.complete(Ok(Bytes::from_static(b"v")));

        assert!(matches!(
            waiter.wait(Duration::ZERO).await,
            FlightResult::Completed(Ok(_))
        ));
    }
}
