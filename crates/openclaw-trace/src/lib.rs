//! OpenClaw Trace - Structured reasoning traces for agent decisions.
//!
//! One [`ReasoningTrace`] is recorded per agent decision: the gate decision
//! chain, the tool outcome, and LLM usage, finalised once and appended as a
//! single JSON line to the session's trace file. Trace failure must never
//! block agent execution, so the writer swallows I/O errors and the tracer
//! is only constructed when diagnostics are enabled.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod context;
pub mod cost;
pub mod decompose;
pub mod error;
pub mod query;
pub mod trace;
pub mod tracer;
pub mod writer;

pub use context::{
    GateDecisionRecord, LlmResponseRecord, StartDecisionParams, ToolOutcomeRecord, TraceContext,
};
pub use cost::{CostSnapshot, CostTracker, LlmUsage};
pub use decompose::{Decomposition, decompose_task};
pub use error::{TraceError, TraceResult};
pub use query::{TraceQuery, TraceQueryParams, TraceSortKey};
pub use trace::{
    ReasoningTrace, TraceContextInfo, TraceDecision, TraceInput, TraceOutcome, TraceReflection,
};
pub use tracer::{ReasoningTracer, create_reasoning_tracer};
pub use writer::TraceWriter;
