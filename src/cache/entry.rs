//! Cache Entry Module
//!
//! Defines immutable cache entries together with the descriptor needed to
//! recompute them.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::cache::CacheKey;

// == Producer Recipe ==
/// Inspectable description of how to recompute an entry: which producer,
/// with which ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerRecipe {
    /// Producer identifier (the key family it is registered under)
    pub producer: String,
    /// Ordered producer arguments
    pub args: Vec<String>,
}

impl ProducerRecipe {
    pub fn new(producer: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            producer: producer.into(),
            args,
        }
    }

    /// Derives the recipe from a key: the view selects the producer, the
    /// remaining components (lang, segment, page) become its arguments.
    pub fn for_key(key: &CacheKey) -> Self {
        let mut args = Vec::with_capacity(3);
        if let Some(lang) = key.lang() {
            args.push(lang.to_string());
        }
        if let Some(segment) = key.segment() {
            args.push(segment.to_string());
        }
        args.push(key.page().to_string());
        Self::new(key.view(), args)
    }
}

// == Entry State ==
/// Position of an entry in its refresh lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryState {
    /// Well before expiry
    Fresh,
    /// Within the refresh lookahead window
    NearingExpiry,
    /// Past expiry without a successful refresh; still kept for stale fallback
    Stale,
}

// == Cache Entry ==
/// A produced artifact and its refresh metadata.
///
/// Entries are never mutated; a refresh builds a new entry and swaps it in.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key of the store slot this entry occupies
    pub key: CacheKey,
    /// The produced bytes
    pub value: Bytes,
    /// When the value was produced
    pub created_at: Instant,
    /// After this instant the value is stale
    pub expires_at: Instant,
    /// Lifetime granted to each successful recompute
    pub refresh_interval: Duration,
    /// How to recompute the value
    pub recipe: ProducerRecipe,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry produced now, expiring `refresh_interval` from now.
    pub fn new(
        key: CacheKey,
        value: Bytes,
        recipe: ProducerRecipe,
        refresh_interval: Duration,
    ) -> Self {
        let now = Instant::now();
        Self {
            key,
            value,
            created_at: now,
            expires_at: now + refresh_interval,
            refresh_interval,
            recipe,
        }
    }

    // == Refreshed ==
    /// Builds the successor entry carrying a newly produced value.
    pub fn refreshed(&self, value: Bytes) -> Self {
        Self::new(
            self.key.clone(),
            value,
            self.recipe.clone(),
            self.refresh_interval,
        )
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Remaining lifetime; zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Time since the value was produced.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.created_at)
    }

    /// True when expiry is at most `lookahead` away, or already passed.
    pub fn needs_refresh(&self, lookahead: Duration) -> bool {
        self.ttl_remaining() <= lookahead
    }

    pub fn state(&self, lookahead: Duration) -> EntryState {
        if self.is_expired() {
            EntryState::Stale
        } else if self.needs_refresh(lookahead) {
            EntryState::NearingExpiry
        } else {
            EntryState::Fresh
        }
    }
}
