//! Cache Module
//!
//! Self-refreshing, capacity-bounded cache of produced artifacts: admission,
//! storage, single-flight recompute and the engine tying them together.

mod admission;
mod coordinator;
mod engine;
mod entry;
mod key;
mod producer;
mod stats;
mod store;


// Re-export public types
pub use admission::{AdmissionPolicy, DEFAULT_UNCACHED_VIEWS};
pub use coordinator::{
    Acquired, FlightGuard, FlightOutcome, FlightResult, FlightWaiter, RecomputeCoordinator,
};
pub use engine::{ArtifactCache, CacheSettings, EntryInfo, RefreshOutcome};
pub use entry::{CacheEntry, EntryState, ProducerRecipe};
pub use key::CacheKey;
pub use producer::{producer_fn, FnProducer, Producer, ProducerRegistry};
pub use stats::{CacheStats, StatsRecorder};
pub use store::{CacheStore, SetOutcome};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum artifact size admitted to the store
pub const MAX_VALUE_SIZE: usize = 4 * 1024 * 1024; // 4 MB
