//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Refresh sweeper: recomputes cache entries before they expire

mod sweeper;

pub use sweeper::{spawn_sweeper_task, Sweeper};
