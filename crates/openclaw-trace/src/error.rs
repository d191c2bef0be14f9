//! Error types for trace persistence and querying.

use thiserror::Error;

/// Errors raised by trace querying. Writing never raises: the writer is
/// fire-and-forget by contract.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Filesystem access failed while reading trace files.
    #[error("trace io error: {0}")]
    Io(#[from] std::io::Error),

    /// A trace could not be serialised.
    #[error("trace serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for trace operations.
pub type TraceResult<T> = Result<T, TraceError>;
