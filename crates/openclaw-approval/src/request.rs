//! Approval request and record types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use openclaw_autonomy::{ActionTier, AutonomyLevel};
use openclaw_core::types::{ApprovalId, TraceId, now_ms, truncate_with_ellipsis};

/// Maximum length of the parameter summary shown to the approver.
pub const PARAMS_SUMMARY_MAX_CHARS: usize = 500;

/// A request for human approval of a suspended tool call.
///
/// Carries everything the approver needs for an informed decision, plus the
/// trace ID so the decision can be joined back to the reasoning trace
/// offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// The tool the agent wants to call.
    pub tool_name: String,
    /// Single-line parameter summary, at most 500 characters.
    pub params_summary: String,
    /// The tier the call was classified as.
    pub tier: ActionTier,
    /// The autonomy level the gate evaluated at.
    pub level: AutonomyLevel,
    /// Why the gate asked for approval.
    pub gate_reason: String,
    /// Caller-supplied confidence, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Which agent issued the call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Session the call belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Reasoning trace this call is recorded under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<TraceId>,
}

impl ApprovalRequest {
    /// Create a request, summarising the raw tool parameters.
    #[must_use]
    pub fn new(
        tool_name: impl Into<String>,
        params: &Value,
        tier: ActionTier,
        level: AutonomyLevel,
        gate_reason: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            params_summary: summarize_params(params),
            tier,
            level,
            gate_reason: gate_reason.into(),
            confidence: None,
            agent_id: None,
            session_key: None,
            trace_id: None,
        }
    }

    /// Attach the caller's confidence estimate.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach the issuing agent.
    #[must_use]
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Attach the session key.
    #[must_use]
    pub fn with_session_key(mut self, session_key: impl Into<String>) -> Self {
        self.session_key = Some(session_key.into());
        self
    }

    /// Attach the reasoning-trace ID.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

impl fmt::Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] at level {}: {}",
            self.tool_name, self.tier, self.level, self.gate_reason
        )
    }
}

/// Summarise tool parameters into a single line of at most
/// [`PARAMS_SUMMARY_MAX_CHARS`] characters.
///
/// Newlines are collapsed before truncation so no newline survives the
/// boundary; over-limit summaries end with a single ellipsis code point.
#[must_use]
pub fn summarize_params(params: &Value) -> String {
    let raw = match params {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    };
    let single_line = raw
        .split(['\n', '\r'])
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    truncate_with_ellipsis(&single_line, PARAMS_SUMMARY_MAX_CHARS)
}

/// The human's decision on an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalDecision {
    /// Proceed this time only.
    AllowOnce,
    /// Proceed, and persist an auto-approve rule for this `(tool, tier)`.
    AllowAlways,
    /// Refuse the call.
    Deny,
}

impl ApprovalDecision {
    /// Whether the decision lets the call proceed.
    #[must_use]
    pub fn is_approved(self) -> bool {
        !matches!(self, Self::Deny)
    }

    /// Kebab-case name as used in the `gate` command.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllowOnce => "allow-once",
            Self::AllowAlways => "allow-always",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending or resolved approval, owned by the approval manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Unique record identifier.
    pub id: ApprovalId,
    /// The request awaiting a decision.
    pub request: ApprovalRequest,
    /// When the record was created (epoch ms).
    pub created_at_ms: u64,
    /// Absolute expiry instant (`created_at_ms + timeout_ms`).
    pub expires_at_ms: u64,
    /// When a human resolved the record, if they did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<u64>,
    /// The decision, when resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<ApprovalDecision>,
    /// Who resolved it (chat handle, terminal user).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

impl ApprovalRecord {
    /// Create a record for a request.
    ///
    /// A supplied `id` is trimmed and parsed; when absent or invalid a
    /// fresh UUID is used instead.
    #[must_use]
    pub fn new(request: ApprovalRequest, timeout_ms: u64, id: Option<&str>) -> Self {
        let id = id
            .and_then(ApprovalId::parse)
            .unwrap_or_default();
        let created_at_ms = now_ms();
        Self {
            id,
            request,
            created_at_ms,
            expires_at_ms: created_at_ms + timeout_ms,
            resolved_at_ms: None,
            decision: None,
            resolved_by: None,
        }
    }

    /// Whether a human decision was recorded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.decision.is_some()
    }
}
