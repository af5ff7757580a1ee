//! Error types for the query adapter.

use super::OperationKind;
use crate::backend::BackendError;
use thiserror::Error;

/// Errors returned by [`QueryAdapter`](super::QueryAdapter) operations.
///
/// Coarse, operation-level messages keep the backend failure as their `source`.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The operation kind is not one of the nine the adapter serves.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The parameter object does not fit the operation.
    #[error("Invalid parameters for {operation}: {reason}")]
    InvalidParams {
        operation: OperationKind,
        reason: String,
    },

    /// The requested record does not exist.
    #[error("Unable to find record {resource}/{id}")]
    NotFound {
        resource: String,
        id: String,
        #[source]
        source: BackendError,
    },

    /// The backend refused a save (validation, permissions, transport).
    #[error("Unable to save record in {resource}")]
    Rejected {
        resource: String,
        #[source]
        source: BackendError,
    },

    /// One request of a fan-out failed, failing the whole batch.
    #[error("{message}")]
    BatchFailure {
        message: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("Unable to delete")]
    Delete {
        #[source]
        source: BackendError,
    },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl AdapterError {
    /// Maps a failed fetch-by-id: a missing object becomes [`AdapterError::NotFound`], anything
    /// else goes through `otherwise`.
    pub(crate) fn lookup(
        resource: &str,
        id: &str,
        source: BackendError,
        otherwise: impl FnOnce(BackendError) -> Self,
    ) -> Self {
        match source {
            BackendError::ObjectNotFound { .. } => AdapterError::NotFound {
                resource: resource.to_string(),
                id: id.to_string(),
                source,
            },
            source => otherwise(source),
        }
    }
}
