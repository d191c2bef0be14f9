//! Progression tracker — per-agent approval track record and upgrade proposals.
//!
//! Stats live in `autonomy-progression.json` under the state directory.
//! Every operation is load → mutate → save; nothing is cached across calls,
//! so concurrent readers of the file observe consistent snapshots. All reads
//! fail soft: a missing, unparseable, or wrong-version file is an empty one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use openclaw_core::config::ProgressionConfig;
use openclaw_core::paths::write_json_secure;
use openclaw_core::types::now_ms;

use crate::level::AutonomyLevel;

/// File name under the state directory.
pub const PROGRESSION_FILE_NAME: &str = "autonomy-progression.json";

const FILE_VERSION: u32 = 1;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Per-agent approval counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionStats {
    /// Total approvals ever recorded for the agent.
    pub total_approvals: u64,
    /// Total denials ever recorded for the agent.
    pub total_denials: u64,
    /// Approvals since the last denial.
    pub consecutive_successes: u64,
    /// When an upgrade proposal was last surfaced to the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_proposal_at_ms: Option<u64>,
    /// The level that proposal suggested upgrading to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_proposal_level: Option<AutonomyLevel>,
}

impl ProgressionStats {
    /// Total recorded decisions.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total_approvals + self.total_denials
    }

    /// Approval rate over all recorded decisions, 0 when none recorded.
    #[must_use]
    pub fn approval_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.total_approvals as f64 / total as f64
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ProgressionFile {
    version: u32,
    agents: BTreeMap<String, ProgressionStats>,
}

impl ProgressionFile {
    fn empty() -> Self {
        Self {
            version: FILE_VERSION,
            agents: BTreeMap::new(),
        }
    }
}

/// The tracker's answer to "should we propose an upgrade?".
#[derive(Debug, Clone)]
pub struct UpgradeProposal {
    /// Whether an upgrade should be proposed now.
    pub propose: bool,
    /// The agent's current level.
    pub from_level: AutonomyLevel,
    /// The proposed level, when `propose` is true.
    pub to_level: Option<AutonomyLevel>,
    /// Snapshot of the stats the decision was based on.
    pub stats: ProgressionStats,
    /// Which guard passed or failed, in user-facing terms.
    pub reason: String,
}

/// File-backed, per-agent progression tracker.
#[derive(Debug, Clone)]
pub struct ProgressionTracker {
    path: PathBuf,
}

impl ProgressionTracker {
    /// Create a tracker persisting to the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Tracker at the default location under the state directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the state directory cannot be resolved.
    pub fn at_default_location() -> openclaw_core::CoreResult<Self> {
        Ok(Self::new(
            openclaw_core::paths::state_dir()?.join(PROGRESSION_FILE_NAME),
        ))
    }

    fn load(&self) -> ProgressionFile {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return ProgressionFile::empty();
        };
        match serde_json::from_str::<ProgressionFile>(&raw) {
            Ok(file) if file.version == FILE_VERSION => file,
            Ok(file) => {
                tracing::debug!(
                    version = file.version,
                    "ignoring progression file with unexpected version"
                );
                ProgressionFile::empty()
            },
            Err(err) => {
                tracing::debug!(error = %err, "ignoring malformed progression file");
                ProgressionFile::empty()
            },
        }
    }

    fn save(&self, file: &ProgressionFile) {
        if let Err(err) = write_json_secure(&self.path, file) {
            tracing::warn!(error = %err, path = %self.path.display(), "failed to persist progression stats");
        }
    }

    /// Record the outcome of one resolved approval.
    ///
    /// Approvals bump both the total and the consecutive streak; denials
    /// bump the denial total and reset the streak.
    pub fn record_approval_outcome(&self, approved: bool, agent_id: &str) {
        let mut file = self.load();
        let stats = file.agents.entry(agent_id.to_string()).or_default();
        if approved {
            stats.total_approvals += 1;
            stats.consecutive_successes += 1;
        } else {
            stats.total_denials += 1;
            stats.consecutive_successes = 0;
        }
        self.save(&file);
    }

    /// Evaluate the upgrade guards for an agent, in short-circuit order:
    /// level headroom, enabled, minimum volume, approval rate, cooldown.
    #[must_use]
    pub fn should_propose_upgrade(
        &self,
        current_level: AutonomyLevel,
        config: &ProgressionConfig,
        agent_id: &str,
    ) -> UpgradeProposal {
        let stats = self
            .load()
            .agents
            .get(agent_id)
            .cloned()
            .unwrap_or_default();

        let no = |reason: String, stats: ProgressionStats| UpgradeProposal {
            propose: false,
            from_level: current_level,
            to_level: None,
            stats,
            reason,
        };

        let Some(next) = current_level.next() else {
            return no(
                format!("Already at maximum autonomy level '{current_level}'"),
                stats,
            );
        };

        if !config.enabled {
            return no("Autonomy progression is disabled".to_string(), stats);
        }

        let total = stats.total();
        if total < config.min_approvals {
            return no(
                format!(
                    "Need at least {} recorded decisions before proposing an upgrade (have {total})",
                    config.min_approvals
                ),
                stats,
            );
        }

        let rate = stats.approval_rate();
        if rate < config.min_approval_rate {
            return no(
                format!(
                    "Approval rate {:.1}% is below the required {:.1}%",
                    rate * 100.0,
                    config.min_approval_rate * 100.0
                ),
                stats,
            );
        }

        if let Some(last) = stats.last_proposal_at_ms {
            let cooldown_ms = config.cooldown_days * MS_PER_DAY;
            let elapsed = now_ms().saturating_sub(last) as f64;
            if elapsed < cooldown_ms {
                return no(
                    format!(
                        "Last proposal was {:.1} days ago; cooldown is {} days",
                        elapsed / MS_PER_DAY,
                        config.cooldown_days
                    ),
                    stats,
                );
            }
        }

        UpgradeProposal {
            propose: true,
            from_level: current_level,
            to_level: Some(next),
            reason: format!(
                "{} of {} decisions approved ({:.1}%); proposing upgrade from '{current_level}' to '{next}'",
                stats.total_approvals,
                total,
                rate * 100.0
            ),
            stats,
        }
    }

    /// Record that an upgrade proposal was surfaced to the user, starting
    /// the cooldown clock.
    pub fn mark_proposal_surfaced(&self, agent_id: &str, to_level: AutonomyLevel) {
        let mut file = self.load();
        let stats = file.agents.entry(agent_id.to_string()).or_default();
        stats.last_proposal_at_ms = Some(now_ms());
        stats.last_proposal_level = Some(to_level);
        self.save(&file);
    }

    /// Delete an agent's progression entry entirely.
    pub fn reset(&self, agent_id: &str) {
        let mut file = self.load();
        if file.agents.remove(agent_id).is_some() {
            self.save(&file);
        }
    }

    /// Snapshot an agent's stats (default empty stats when unrecorded).
    #[must_use]
    pub fn stats(&self, agent_id: &str) -> ProgressionStats {
        self.load()
            .agents
            .get(agent_id)
            .cloned()
            .unwrap_or_default()
    }
}
