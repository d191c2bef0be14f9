//! The pipeline's error taxonomy.
//!
//! Each variant carries a distinctive tagged prefix in its message so logs
//! and chat-surface errors stay grep-able. The pipeline never retries; a
//! failed call is failed, and only a brand-new tool call may try again.

use thiserror::Error;

/// Fatal errors a tool call can hit on its way through the pipeline.
///
/// Tool execution failures are NOT here: they come back as structured
/// `{status: "error", …}` results unless the caller aborted.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The target path is outside the filesystem boundary.
    #[error("fs-boundary: {reason}")]
    FsBoundary {
        /// Boundary check reason.
        reason: String,
    },

    /// The policy matrix denied the action outright.
    #[error("autonomy-gate denied: {reason}")]
    GateDenied {
        /// The gate's reason.
        reason: String,
    },

    /// A human denied the approval request.
    #[error("autonomy-gate approval denied for tool call {tool}")]
    ApprovalDenied {
        /// The tool that was denied.
        tool: String,
    },

    /// The approval timer expired without a decision.
    #[error("autonomy-gate approval timed out for tool call {tool}")]
    ApprovalTimedOut {
        /// The tool whose approval expired.
        tool: String,
    },

    /// The external before-hook vetoed the call.
    #[error("before-hook blocked: {reason}")]
    BeforeHookBlocked {
        /// The hook's reason.
        reason: String,
    },

    /// The caller aborted; cancellation propagates unchanged.
    #[error("tool call aborted: {tool}")]
    Aborted {
        /// The tool whose call was aborted.
        tool: String,
    },
}

/// Result type for pipeline dispatch.
pub type PipelineResult<T> = Result<T, PipelineError>;
