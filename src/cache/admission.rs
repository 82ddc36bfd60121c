//! Admission Policy Module
//!
//! Decides which keys are worth storing. Hot traffic concentrates on the first
//! few pages of each view; deeper pages and ad-hoc searches are computed on
//! every request instead of taking a slot.

use std::collections::HashSet;

use crate::cache::CacheKey;

/// Views that are never cached by default.
pub const DEFAULT_UNCACHED_VIEWS: &[&str] = &["search"];

// == Admission Policy ==
/// Pure, deterministic cache-eligibility check.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    /// Pages strictly below this depth are cacheable
    max_page_depth: u32,
    /// Key families that always bypass the store
    uncached_views: HashSet<String>,
}

impl AdmissionPolicy {
    pub fn new(max_page_depth: u32, uncached_views: &[String]) -> Self {
        Self {
            max_page_depth,
            uncached_views: uncached_views.iter().cloned().collect(),
        }
    }

    /// Depth-only policy with no excluded views.
    pub fn with_depth(max_page_depth: u32) -> Self {
        Self::new(max_page_depth, &[])
    }

    // == Is Cacheable ==
    /// Returns whether `key` may be stored. Same key, same answer.
    pub fn is_cacheable(&self, key: &CacheKey) -> bool {
        key.page() < self.max_page_depth && !self.uncached_views.contains(key.view())
    }

    pub fn max_page_depth(&self) -> u32 {
        self.max_page_depth
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        let views: Vec<String> = DEFAULT_UNCACHED_VIEWS.iter().map(|v| v.to_string()).collect();
        Self::new(5, &views)
    }
}
