//! OpenClaw Scan - Content inspection for the safety core.
//!
//! Three related surfaces share one pattern-based sensitive-data scanner:
//!
//! - [`ToolOutputSanitizer`] defangs tool output before it re-enters the
//!   agent's context (injection markers stripped, bodies wrapped)
//! - [`OutputScanner`] inspects outbound agent text for credential leakage
//!   and system-prompt echo
//! - [`DataFlowValidator`] guards data bound for external providers,
//!   redacting secrets before transmission

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod dataflow;
pub mod injection;
pub mod output;
pub mod sanitize;
pub mod sensitive;

pub use dataflow::{DataFlowValidator, DataFlowVerdict};
pub use injection::{
    EXTERNAL_CONTENT_END_MARKER, EXTERNAL_CONTENT_MARKER, TOOL_OUTPUT_END_MARKER,
    TOOL_OUTPUT_MARKER, detect_injection_patterns,
};
pub use output::{OutputScanner, ScanSeverity, ScanVerdict, ScanViolation};
pub use sanitize::{SanitizedOutput, ToolOutputSanitizer};
pub use sensitive::{SensitiveMatch, contains_sensitive_data, redact, scan_sensitive_data};
