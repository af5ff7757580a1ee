//! # Backend Errors
//!
//! Errors raised at the backend boundary. Every [`Backend`](super::Backend) implementation
//! reports failures through this one type, so the adapter can wrap them without caring which
//! backend produced them.

/// Errors that can occur while talking to an object-query backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend closed")]
    BackendClosed,
    #[error("Backend dropped response channel")]
    BackendDropped,
    #[error("Object not found: {class}/{id}")]
    ObjectNotFound { class: String, id: String },
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Backend rejected request: {0}")]
    Rejected(String),
    #[error("Invalid backend configuration: {0}")]
    InvalidConfig(String),
    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
