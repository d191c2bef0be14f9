//! OpenClaw Autonomy - Tiered autonomy policy for agent tool calls.
//!
//! This crate decides, per tool call, whether the agent may proceed on its
//! own authority:
//!
//! - [`ActionTier`] classifies a tool call by blast radius
//! - [`ActionClassifier`] maps `(tool name, hint)` to a tier
//! - [`evaluate_gate`] applies the `(level, tier)` policy matrix with a
//!   confidence-weighted downgrade
//! - [`FilesystemBoundary`] rejects tool calls that reach outside configured
//!   readable/writable scopes
//! - [`ProgressionTracker`] keeps the per-agent approval track record and
//!   proposes autonomy upgrades when it warrants

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod boundary;
pub mod classifier;
pub mod gate;
pub mod level;
pub mod progression;
pub mod tier;

pub use boundary::{
    AccessMode, BoundaryCheck, FilesystemBoundary, extract_tool_path, is_path_inside,
    tool_filesystem_mode,
};
pub use classifier::{ActionClassifier, ToolAutonomyHint};
pub use gate::{DEFAULT_CONFIDENCE_THRESHOLD, GateDecision, GateEvaluation, evaluate_gate};
pub use level::{AutonomyLevel, parse_autonomy_level};
pub use progression::{ProgressionStats, ProgressionTracker, UpgradeProposal};
pub use tier::ActionTier;
