//! Error types shared by the safety core foundation.

use thiserror::Error;

/// Errors raised by foundation operations (paths, persistence).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Neither `$OPENCLAW_STATE_DIR` nor `$HOME` could be resolved.
    #[error("cannot resolve state directory: {0}")]
    StateDirUnavailable(String),

    /// An I/O operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for foundation operations.
pub type CoreResult<T> = Result<T, CoreError>;
