//! Autonomy gate — the pure decision function over `(level, tier, confidence)`.
//!
//! The policy matrix is fixed:
//!
//! | | cached | ephemeral | persistent | sandboxed | irreversible |
//! |---|---|---|---|---|---|
//! | low    | auto | approval | approval | approval | approval |
//! | medium | auto | auto     | approval | approval | approval |
//! | high   | auto | auto     | auto     | auto     | approval |
//!
//! A confidence below the threshold downgrades an auto-approval to
//! approval-required; nothing ever upgrades an approval-required cell.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::level::AutonomyLevel;
use crate::tier::ActionTier;

/// Default confidence threshold for the downgrade rule.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// What the gate decided for one tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Proceed without asking.
    AutoApprove,
    /// Suspend the call pending a human decision.
    NeedsApproval,
    /// Refuse the call outright.
    Denied,
}

impl GateDecision {
    /// Snake-case name as serialised and logged.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AutoApprove => "auto_approve",
            Self::NeedsApproval => "needs_approval",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The gate's full answer for one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateEvaluation {
    /// The decision.
    pub decision: GateDecision,
    /// Human-readable, non-empty explanation.
    pub reason: String,
    /// The level the evaluation ran at.
    pub level: AutonomyLevel,
    /// The tier the action was classified as.
    pub tier: ActionTier,
    /// The confidence supplied by the caller, if any.
    pub confidence: Option<f64>,
}

/// The raw policy matrix cell for `(level, tier)`.
fn policy_decision(level: AutonomyLevel, tier: ActionTier) -> GateDecision {
    match tier {
        ActionTier::CachedPattern => GateDecision::AutoApprove,
        ActionTier::EphemeralCompute => match level {
            AutonomyLevel::Low => GateDecision::NeedsApproval,
            AutonomyLevel::Medium | AutonomyLevel::High => GateDecision::AutoApprove,
        },
        ActionTier::PersistentService | ActionTier::SandboxedWorkspace => match level {
            AutonomyLevel::Low | AutonomyLevel::Medium => GateDecision::NeedsApproval,
            AutonomyLevel::High => GateDecision::AutoApprove,
        },
        ActionTier::Irreversible => GateDecision::NeedsApproval,
    }
}

/// Evaluate the policy matrix for one tool call.
///
/// When the matrix says auto-approve and the caller supplied a confidence
/// strictly below `threshold`, the decision is downgraded to
/// approval-required; a confidence exactly at the threshold stays
/// auto-approved. Approval-required cells are never promoted, whatever the
/// confidence.
#[must_use]
pub fn evaluate_gate(
    level: AutonomyLevel,
    tier: ActionTier,
    confidence: Option<f64>,
    threshold: f64,
) -> GateEvaluation {
    let base = policy_decision(level, tier);

    if base == GateDecision::AutoApprove
        && let Some(confidence) = confidence
        && confidence < threshold
    {
        return GateEvaluation {
            decision: GateDecision::NeedsApproval,
            reason: format!(
                "Confidence {:.0}% is below the {:.0}% threshold for {}; requiring approval",
                confidence * 100.0,
                threshold * 100.0,
                tier.description(),
            ),
            level,
            tier,
            confidence: Some(confidence),
        };
    }

    let reason = match base {
        GateDecision::AutoApprove => format!(
            "Action tier '{tier}' is auto-approved at autonomy level '{level}'"
        ),
        GateDecision::NeedsApproval => format!(
            "Action tier '{tier}' requires approval at autonomy level '{level}'"
        ),
        GateDecision::Denied => format!(
            "Action tier '{tier}' is denied at autonomy level '{level}'"
        ),
    };

    GateEvaluation {
        decision: base,
        reason,
        level,
        tier,
        confidence,
    }
}
