//! Error types for the approval system.

use thiserror::Error;

use openclaw_core::types::ApprovalId;

/// Errors raised by the approval manager and rule store.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// A record with this ID was already resolved (or timed out).
    #[error("approval {id} already resolved")]
    AlreadyResolved {
        /// The record in question.
        id: ApprovalId,
    },

    /// Rule persistence failed.
    #[error("rule storage error: {0}")]
    Storage(String),
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
