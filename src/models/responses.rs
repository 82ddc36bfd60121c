//! Response DTOs for the render API
//!
//! Defines the structure of outgoing JSON bodies for the cache admin endpoints.

use serde::Serialize;

use crate::cache::{CacheStats, EntryInfo};
use crate::feed::Article;

/// Response body for `DELETE /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// The key that was invalidated
    pub key: String,
}

impl InvalidateResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' invalidated", key),
            key,
        }
    }
}

/// Response body for `GET /api/click/:id`
#[derive(Debug, Clone, Serialize)]
pub struct ClickResponse {
    pub id: String,
    /// Click count after this click
    pub clicks: u64,
}

/// Response body for `POST /api/news`
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub message: String,
    /// Id assigned to the stored article
    pub id: String,
    /// Cached pages dropped because they list the new article
    pub invalidated: Vec<String>,
}

impl IngestResponse {
    pub fn new(id: impl Into<String>, invalidated: Vec<String>) -> Self {
        let id = id.into();
        Self {
            message: format!("Article '{}' stored", id),
            id,
            invalidated,
        }
    }
}

/// Response body for `GET /api/news`
#[derive(Debug, Clone, Serialize)]
pub struct NewsItemsResponse {
    pub items: Vec<Article>,
}

/// Response body for `GET /cache/entries`
#[derive(Debug, Clone, Serialize)]
pub struct EntriesResponse {
    pub count: usize,
    pub capacity: usize,
    pub entries: Vec<EntryInfo>,
}

impl EntriesResponse {
    pub fn new(entries: Vec<EntryInfo>, capacity: usize) -> Self {
        Self {
            count: entries.len(),
            capacity,
            entries,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: CacheStats) -> Self {
        let hit_rate = stats.hit_rate();
        Self { stats, hit_rate }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
