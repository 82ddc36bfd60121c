//! Request and Response models for the render API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{parse_page, IngestRequest, NewsParams, SearchParams, ViewRequest, MAX_PAGE};
pub use responses::{
    ClickResponse, EntriesResponse, ErrorResponse, HealthResponse, IngestResponse,
    InvalidateResponse, NewsItemsResponse, StatsResponse,
};
