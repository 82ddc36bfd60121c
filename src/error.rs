//! Error types for the render cache
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Producer Error ==
/// Failure of the computation that builds an artifact.
///
/// Cloneable so that a single recompute outcome can be handed to every
/// caller waiting on the same key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProducerError {
    /// The producer ran and reported a failure (e.g. store unavailable)
    #[error("Producer failed: {0}")]
    Failed(String),

    /// The producer did not finish within its deadline
    #[error("Producer exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// No producer registered for the key family
    #[error("No producer registered for '{0}'")]
    Unregistered(String),
}

impl ProducerError {
    /// Shorthand for [`ProducerError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        ProducerError::Failed(msg.into())
    }
}

// == Cache Error Enum ==
/// Unified error type for the render cache.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Store is at capacity and the key is not resident
    #[error("Capacity exceeded: cannot admit '{0}'")]
    CapacityExceeded(String),

    /// Waiting on another in-flight recompute took too long
    #[error("Recompute timeout for '{0}'")]
    RecomputeTimeout(String),

    /// The producer failed
    #[error(transparent)]
    Producer(#[from] ProducerError),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::CapacityExceeded(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::RecomputeTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Producer(ProducerError::DeadlineExceeded(_)) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Producer(ProducerError::Unregistered(_)) => StatusCode::NOT_FOUND,
            CacheError::Producer(ProducerError::Failed(_)) => StatusCode::BAD_GATEWAY,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the render cache.
pub type Result<T> = std::result::Result<T, CacheError>;
