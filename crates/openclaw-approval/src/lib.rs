//! OpenClaw Approval - Human-in-the-loop approval for agent tool calls.
//!
//! When the autonomy gate says a tool call needs a human decision, this
//! crate suspends the call:
//!
//! - [`ApprovalManager`] queues an [`ApprovalRecord`] with a bounded expiry
//!   timer and hands the caller a future that completes with the decision
//!   (or the timeout sentinel)
//! - [`AutoApproveStore`] persists `(tool pattern, tier)` rules that
//!   short-circuit future approvals after an "allow always" decision
//! - [`parse_gate_command`] parses the `gate <id> <decision>` chat command
//!
//! The manager emits [`ApprovalEvent`]s on a broadcast channel so chat-layer
//! forwarders can present requests without holding references back into the
//! manager.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod command;
pub mod error;
pub mod manager;
pub mod pattern;
pub mod request;
pub mod rules;

pub use command::{CommandParseError, GateCommand, parse_gate_command};
pub use error::{ApprovalError, ApprovalResult};
pub use manager::{ApprovalEvent, ApprovalManager, DecisionFuture};
pub use pattern::{matches_tool_pattern, normalize_tool_name};
pub use request::{ApprovalDecision, ApprovalRecord, ApprovalRequest};
pub use rules::{AutoApproveRule, AutoApproveStore, DEFAULT_AGENT_ID, WILDCARD_AGENT_ID};
