//! The on-disk reasoning trace shape.
//!
//! One JSON object per line in `<baseDir>/<agentId>/<sessionId>.jsonl`,
//! camelCase keys. Every field group below is required on disk unless
//! marked optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A complete per-decision record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningTrace {
    /// Trace id, unique within its session file.
    pub id: String,
    /// When the decision started.
    pub timestamp: DateTime<Utc>,
    /// What prompted the decision.
    pub input: TraceInput,
    /// The world as the agent saw it.
    pub context: TraceContextInfo,
    /// What the agent decided and why.
    pub decision: TraceDecision,
    /// What happened when it acted.
    pub outcome: TraceOutcome,
    /// Optional post-hoc reflection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<TraceReflection>,
}

/// What prompted a decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceInput {
    /// The user message being handled, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    /// The system event being handled, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_event: Option<String>,
    /// Parent trace id when this decision is a subtask.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtask_of: Option<String>,
}

/// Agent context at decision time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceContextInfo {
    /// Tools the agent could have called.
    pub available_tools: Vec<String>,
    /// Active user model identifier.
    pub active_user_model: String,
    /// Character/persona state identifier.
    pub character_state: String,
    /// Autonomy level in force.
    pub autonomy_level: String,
    /// Memory snippets considered relevant.
    pub relevant_memories: Vec<String>,
}

/// The decision itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceDecision {
    /// The action taken (tool name, stop reason, or `"response"`).
    pub action: String,
    /// Model reasoning, when trace config includes it.
    pub reasoning: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Action classification (tier name, or `"unknown"`).
    pub classification: String,
    /// Whether any gate decision in this trace required approval.
    pub approval_required: bool,
    /// First gate record's approval outcome, when approval was involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_outcome: Option<String>,
}

/// What happened when the agent acted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceOutcome {
    /// Whether the decision succeeded.
    pub success: bool,
    /// Result text, truncated to the configured maximum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Error text, when the decision failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the decision in milliseconds.
    pub duration: u64,
    /// Total LLM tokens consumed by the decision.
    pub token_count: u64,
    /// Total estimated LLM cost in USD.
    pub estimated_cost: f64,
}

/// Optional post-hoc reflection on a decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceReflection {
    /// Self-assessed quality in `[0, 1]`.
    pub quality_score: f64,
    /// Alternatives the agent weighed.
    pub alternatives_considered: Vec<String>,
    /// What the agent learned.
    pub lessons_learned: String,
    /// Observed user satisfaction signal, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_satisfaction_signal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReasoningTrace {
        ReasoningTrace {
            id: "0b7f3a58-7f2c-4bfb-9f65-52a9d2b19c01".to_string(),
            timestamp: Utc::now(),
            input: TraceInput {
                user_message: Some("list my files".to_string()),
                system_event: None,
                subtask_of: None,
            },
            context: TraceContextInfo {
                available_tools: vec!["read".to_string(), "ls".to_string()],
                active_user_model: "default".to_string(),
                character_state: "neutral".to_string(),
                autonomy_level: "low".to_string(),
                relevant_memories: Vec::new(),
            },
            decision: TraceDecision {
                action: "ls".to_string(),
                reasoning: "user asked for a listing".to_string(),
                confidence: 0.9,
                classification: "cached_pattern".to_string(),
                approval_required: false,
                approval_outcome: None,
            },
            outcome: TraceOutcome {
                success: true,
                result: Some("3 files".to_string()),
                error: None,
                duration: 42,
                token_count: 120,
                estimated_cost: 0.0004,
            },
            reflection: None,
        }
    }

    #[test]
    fn test_serializes_to_single_line_camel_case() {
        let trace = sample();
        let line = serde_json::to_string(&trace).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"userMessage\""));
        assert!(line.contains("\"availableTools\""));
        assert!(line.contains("\"approvalRequired\""));
        assert!(line.contains("\"tokenCount\""));
        // Absent optionals are omitted, not nulled.
        assert!(!line.contains("systemEvent"));
        assert!(!line.contains("reflection"));
    }

    #[test]
    fn test_roundtrip() {
        let trace = sample();
        let line = serde_json::to_string(&trace).unwrap();
        let back: ReasoningTrace = serde_json::from_str(&line).unwrap();
        assert_eq!(back.id, trace.id);
        assert_eq!(back.decision.action, "ls");
        assert_eq!(back.outcome.token_count, 120);
    }
}
