//! Seams to the pipeline's external collaborators.
//!
//! The plugin/hook runtime and the tool registry live outside the safety
//! core; the pipeline reaches them only through these traits.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Streaming updates emitted by a running tool.
pub type UpdateSink = tokio::sync::mpsc::UnboundedSender<Value>;

/// Verdict of the before-hook for one tool call.
#[derive(Debug, Clone)]
pub enum HookVerdict {
    /// Proceed, optionally with adjusted parameters.
    Proceed {
        /// Replacement parameters, when the hook rewrote them.
        adjusted_params: Option<Value>,
    },
    /// Veto the call.
    Block {
        /// Why the hook blocked it.
        reason: String,
    },
}

/// Pre/post hooks around tool execution.
///
/// The after-hook is best-effort: the pipeline swallows its failures.
#[async_trait]
pub trait ToolHooks: Send + Sync {
    /// Runs before any safety check. May adjust parameters or block.
    async fn before_tool_call(&self, tool: &str, params: &Value) -> HookVerdict;

    /// Runs after execution (or failure). `error` is set when the call
    /// errored.
    async fn after_tool_call(&self, tool: &str, result: Option<&Value>, error: Option<&str>);
}

/// Error surface of a tool executor.
#[derive(Debug, Clone)]
pub struct ToolError {
    /// Human-readable failure description.
    pub message: String,
    /// True when the failure was a cancellation; aborts propagate
    /// unchanged instead of becoming structured error results.
    pub aborted: bool,
}

impl ToolError {
    /// A plain execution failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            aborted: false,
        }
    }

    /// A cancellation.
    #[must_use]
    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            aborted: true,
        }
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ToolError {}

/// Executes tools. External collaborator: the registry, sandboxing, and
/// transport are not the safety core's concern.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run one tool call to completion.
    async fn execute(
        &self,
        tool_call_id: &str,
        tool: &str,
        params: &Value,
        updates: Option<UpdateSink>,
        cancel: &CancellationToken,
    ) -> Result<Value, ToolError>;
}
