//! Refresh Cache - a self-refreshing artifact cache for paginated feed views
//!
//! Rendered pages are cached per key, kept warm by a background sweeper and
//! recomputed at most once at a time no matter how many requests miss.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{ArtifactCache, CacheKey};
pub use config::Config;
pub use tasks::spawn_sweeper_task;
