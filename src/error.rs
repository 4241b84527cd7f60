//! Unified error handling for topic-unread.
//!
//! Each layer has its own error type; [`UnreadError`] is what the public
//! operations return and converts from the lower layers automatically.

use crate::Tid;
use thiserror::Error;

// ============================================================================
// Store Errors (sorted-set backend)
// ============================================================================

/// Errors raised by a [`SortedSetStore`](crate::store::SortedSetStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ============================================================================
// Service Errors (external collaborators)
// ============================================================================

/// Errors raised by the collaborator traits in [`crate::collaborators`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },
}

// ============================================================================
// Unread Errors (public API)
// ============================================================================

/// Errors returned by [`UnreadService`](crate::UnreadService) operations.
#[derive(Debug, Error)]
pub enum UnreadError {
    #[error("no such topic: {0}")]
    NoTopic(Tid),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("service error: {0}")]
    Service(#[from] ServiceError),
}

impl UnreadError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoTopic(_) => "no_topic",
            Self::Store(_) => "store_error",
            Self::Service(_) => "service_error",
        }
    }
}

/// Result type for unread operations.
pub type UnreadResult<T> = Result<T, UnreadError>;
