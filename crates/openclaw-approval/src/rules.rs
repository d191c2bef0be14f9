//! Persistent auto-approve rule store.
//!
//! Rules are keyed by agent id and persisted to `autonomy-rules.json` under
//! the state directory as pretty-printed JSON with `0600` permissions. Every
//! operation is load → mutate → save; all reads fail soft, so a missing,
//! unparseable, or wrong-version file behaves as an empty rule set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use openclaw_autonomy::ActionTier;
use openclaw_core::paths::write_json_secure;
use openclaw_core::types::{RuleId, now_ms};

use crate::error::{ApprovalError, ApprovalResult};
use crate::pattern::{matches_tool_pattern, normalize_tool_name};

/// File name under the state directory.
pub const RULES_FILE_NAME: &str = "autonomy-rules.json";

/// Agent id used when the caller does not name one.
pub const DEFAULT_AGENT_ID: &str = "main";

/// Agent id whose rules apply to every agent.
pub const WILDCARD_AGENT_ID: &str = "*";

const FILE_VERSION: u32 = 1;

/// One persistent `(tool pattern, tier)` auto-approve grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoApproveRule {
    /// Unique rule identifier.
    pub id: RuleId,
    /// Literal name, trailing-glob `prefix*`, or `*`.
    pub tool_pattern: String,
    /// Tier the rule applies to. A matching name with a different tier does
    /// not short-circuit the gate.
    pub tier: ActionTier,
    /// When the rule was created (epoch ms).
    pub created_at_ms: u64,
    /// When the rule last short-circuited an approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at_ms: Option<u64>,
    /// How many approvals the rule has short-circuited.
    pub use_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AgentRules {
    rules: Vec<AutoApproveRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AutoApproveFile {
    version: u32,
    agents: BTreeMap<String, AgentRules>,
}

impl AutoApproveFile {
    fn empty() -> Self {
        Self {
            version: FILE_VERSION,
            agents: BTreeMap::new(),
        }
    }
}

/// File-backed auto-approve rule store.
#[derive(Debug, Clone)]
pub struct AutoApproveStore {
    path: PathBuf,
}

impl AutoApproveStore {
    /// Create a store persisting to the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location under the state directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the state directory cannot be resolved.
    pub fn at_default_location() -> openclaw_core::CoreResult<Self> {
        Ok(Self::new(
            openclaw_core::paths::state_dir()?.join(RULES_FILE_NAME),
        ))
    }

    fn load(&self) -> AutoApproveFile {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return AutoApproveFile::empty();
        };
        match serde_json::from_str::<AutoApproveFile>(&raw) {
            Ok(file) if file.version == FILE_VERSION => file,
            Ok(file) => {
                tracing::debug!(
                    version = file.version,
                    "ignoring auto-approve file with unexpected version"
                );
                AutoApproveFile::empty()
            },
            Err(err) => {
                tracing::debug!(error = %err, "ignoring malformed auto-approve file");
                AutoApproveFile::empty()
            },
        }
    }

    fn save(&self, file: &AutoApproveFile) -> ApprovalResult<()> {
        write_json_secure(&self.path, file).map_err(|e| ApprovalError::Storage(e.to_string()))
    }

    /// Add a rule for `(tool, tier)` under an agent.
    ///
    /// The tool name is normalised into the stored pattern. Deduplicates on
    /// `(pattern, tier)`: when an equivalent rule exists it is returned
    /// unchanged and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns a storage error when a new rule cannot be persisted.
    pub fn add(
        &self,
        tool_name: &str,
        tier: ActionTier,
        agent_id: Option<&str>,
    ) -> ApprovalResult<AutoApproveRule> {
        let agent_id = agent_id.unwrap_or(DEFAULT_AGENT_ID);
        let pattern = normalize_tool_name(tool_name);

        let mut file = self.load();
        let agent = file.agents.entry(agent_id.to_string()).or_default();

        if let Some(existing) = agent
            .rules
            .iter()
            .find(|rule| rule.tool_pattern == pattern && rule.tier == tier)
        {
            return Ok(existing.clone());
        }

        let rule = AutoApproveRule {
            id: RuleId::new(),
            tool_pattern: pattern,
            tier,
            created_at_ms: now_ms(),
            last_used_at_ms: None,
            use_count: 0,
        };
        agent.rules.push(rule.clone());
        self.save(&file)?;

        tracing::debug!(
            agent = agent_id,
            pattern = %rule.tool_pattern,
            tier = %tier,
            "persisted auto-approve rule"
        );
        Ok(rule)
    }

    /// Look up a rule matching `(tool, tier)`.
    ///
    /// Searches the agent's own rules first, then the wildcard agent `"*"`.
    /// The first rule whose pattern matches the (normalised) tool name and
    /// whose tier equals `tier` wins. A match fires a best-effort usage
    /// update; persistence failures never propagate.
    #[must_use]
    pub fn check(
        &self,
        tool_name: &str,
        tier: ActionTier,
        agent_id: Option<&str>,
    ) -> Option<AutoApproveRule> {
        let agent_id = agent_id.unwrap_or(DEFAULT_AGENT_ID);
        let mut file = self.load();

        let matched = [agent_id, WILDCARD_AGENT_ID].iter().find_map(|scope| {
            file.agents.get(*scope).and_then(|agent| {
                agent
                    .rules
                    .iter()
                    .find(|rule| {
                        rule.tier == tier && matches_tool_pattern(&rule.tool_pattern, tool_name)
                    })
                    .map(|rule| ((*scope).to_string(), rule.id.clone(), rule.clone()))
            })
        });

        let (scope, rule_id, rule) = matched?;

        // Usage bookkeeping is best-effort; the approval decision stands
        // whether or not it can be written back.
        if let Some(stored) = file
            .agents
            .get_mut(&scope)
            .and_then(|agent| agent.rules.iter_mut().find(|r| r.id == rule_id))
        {
            stored.last_used_at_ms = Some(now_ms());
            stored.use_count += 1;
            if let Err(err) = self.save(&file) {
                tracing::debug!(error = %err, "failed to persist rule usage update");
            }
        }

        Some(rule)
    }

    /// Remove a rule by id. Returns `false` when the rule is absent.
    pub fn remove(&self, rule_id: &RuleId, agent_id: Option<&str>) -> bool {
        let agent_id = agent_id.unwrap_or(DEFAULT_AGENT_ID);
        let mut file = self.load();
        let Some(agent) = file.agents.get_mut(agent_id) else {
            return false;
        };

        let before = agent.rules.len();
        agent.rules.retain(|rule| &rule.id != rule_id);
        if agent.rules.len() == before {
            return false;
        }

        if let Err(err) = self.save(&file) {
            tracing::warn!(error = %err, "failed to persist rule removal");
            return false;
        }
        true
    }

    /// List an agent's rules (not including wildcard-agent rules).
    #[must_use]
    pub fn list(&self, agent_id: Option<&str>) -> Vec<AutoApproveRule> {
        let agent_id = agent_id.unwrap_or(DEFAULT_AGENT_ID);
        self.load()
            .agents
            .get(agent_id)
            .map(|agent| agent.rules.clone())
            .unwrap_or_default()
    }

    /// Drop the whole rule file.
    pub fn reset(&self) {
        if let Err(err) = std::fs::remove_file(&self.path)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(error = %err, "failed to remove auto-approve rule file");
        }
    }
}
