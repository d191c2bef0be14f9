//! OpenClaw Pipeline - The policy path every agent tool call traverses.
//!
//! [`SafetyCore`] is the construction root: it assembles the classifier,
//! filesystem boundary, rule store, progression tracker, scanners, and
//! tracer from configuration. [`ToolPipeline`] runs one tool call through
//! the whole chain and either returns the (sanitised) result, a structured
//! error result, or a tagged [`PipelineError`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod hooks;
pub mod pipeline;

pub use error::{PipelineError, PipelineResult};
pub use hooks::{HookVerdict, ToolError, ToolExecutor, ToolHooks, UpdateSink};
pub use pipeline::{SafetyCore, ToolCallRequest, ToolPipeline};
