//! Autonomy levels — the user-chosen trust budget.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much the agent is trusted to act without asking.
///
/// Levels are totally ordered: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    /// Only cached-pattern actions run unattended.
    #[default]
    Low,
    /// Ephemeral compute (shell, file edits) also runs unattended.
    Medium,
    /// Everything short of irreversible actions runs unattended.
    High,
}

impl AutonomyLevel {
    /// The next level up, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Low => Some(Self::Medium),
            Self::Medium => Some(Self::High),
            Self::High => None,
        }
    }

    /// Lowercase name as used in configuration and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse an autonomy level from configuration.
///
/// Accepts the exact lowercase strings `low`, `medium`, and `high`.
/// Anything else, including an absent value, maps to [`AutonomyLevel::Low`].
/// Casing is not normalised: `"LOW"` is invalid and yields `Low` by
/// fallback, not by recognition.
#[must_use]
pub fn parse_autonomy_level(value: Option<&str>) -> AutonomyLevel {
    match value {
        Some("low") => AutonomyLevel::Low,
        Some("medium") => AutonomyLevel::Medium,
        Some("high") => AutonomyLevel::High,
        _ => AutonomyLevel::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_totally_ordered() {
        assert!(AutonomyLevel::Low < AutonomyLevel::Medium);
        assert!(AutonomyLevel::Medium < AutonomyLevel::High);
    }

    #[test]
    fn test_next_level() {
        assert_eq!(AutonomyLevel::Low.next(), Some(AutonomyLevel::Medium));
        assert_eq!(AutonomyLevel::Medium.next(), Some(AutonomyLevel::High));
        assert_eq!(AutonomyLevel::High.next(), None);
    }

    #[test]
    fn test_parse_exact_lowercase() {
        assert_eq!(parse_autonomy_level(Some("low")), AutonomyLevel::Low);
        assert_eq!(parse_autonomy_level(Some("medium")), AutonomyLevel::Medium);
        assert_eq!(parse_autonomy_level(Some("high")), AutonomyLevel::High);
    }

    #[test]
    fn test_parse_rejects_casing_and_unknown() {
        assert_eq!(parse_autonomy_level(Some("LOW")), AutonomyLevel::Low);
        assert_eq!(parse_autonomy_level(Some("High")), AutonomyLevel::Low);
        assert_eq!(parse_autonomy_level(Some("maximum")), AutonomyLevel::Low);
        assert_eq!(parse_autonomy_level(None), AutonomyLevel::Low);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&AutonomyLevel::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }
}
