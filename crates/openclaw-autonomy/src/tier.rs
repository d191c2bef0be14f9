//! Action tiers — coarse impact classification of a tool call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Blast-radius classification of a tool call.
///
/// The gate never auto-approves [`ActionTier::Irreversible`] actions at any
/// autonomy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTier {
    /// Read-only lookups and searches with no lasting effect.
    CachedPattern,
    /// Local compute whose effects are confined to the workspace and easily
    /// undone (shell commands, file edits).
    EphemeralCompute,
    /// Actions that create or mutate long-lived services or schedules.
    PersistentService,
    /// Actions confined to a sandboxed surface (browser, canvas) that can
    /// still interact with the outside world from within it.
    SandboxedWorkspace,
    /// Actions that cannot be taken back once performed (outbound messages).
    Irreversible,
}

impl ActionTier {
    /// Short human description used in gate reasons and approval prompts.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::CachedPattern => "read-only lookups",
            Self::EphemeralCompute => "local compute and file edits",
            Self::PersistentService => "persistent services and schedules",
            Self::SandboxedWorkspace => "sandboxed interactive surfaces",
            Self::Irreversible => "irreversible external actions",
        }
    }

    /// Snake-case name as serialised and logged.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CachedPattern => "cached_pattern",
            Self::EphemeralCompute => "ephemeral_compute",
            Self::PersistentService => "persistent_service",
            Self::SandboxedWorkspace => "sandboxed_workspace",
            Self::Irreversible => "irreversible",
        }
    }
}

impl fmt::Display for ActionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
