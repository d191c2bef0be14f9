//! OpenClaw Core - Foundation types for the agent action safety core.
//!
//! This crate provides:
//! - Identifier newtypes and timestamp helpers shared across the safety core
//! - State-directory resolution and home expansion (`~/.openclaw` by default)
//! - Secure JSON persistence helpers (pretty-printed, `0600` on Unix)
//! - The configuration surface consumed by the safety components

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{
    AutonomyConfig, DataFlowConfig, DiagnosticsConfig, FilesystemBoundaryConfig,
    OutputScanningConfig, ProgressionConfig, ReasoningTraceConfig, SafetyConfig, SecurityConfig,
};
pub use error::{CoreError, CoreResult};
pub use paths::{expand_home, normalize_path, state_dir, write_json_secure};
pub use types::{ApprovalId, RuleId, Timestamp, TraceId, now_ms, truncate_with_ellipsis};
