//! API Module
//!
//! HTTP handlers and routing for the rendered feed views and the cache
//! admin endpoints. See [`create_router`] for the route table.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
