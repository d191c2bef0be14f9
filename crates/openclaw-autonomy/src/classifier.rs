//! Action classifier — maps tool names to action tiers.
//!
//! Resolution priority, top down:
//!
//! 1. Caller-supplied [`ToolAutonomyHint`]
//! 2. Runtime override registered via [`ActionClassifier::register_tool_tier`]
//! 3. Static default registry
//! 4. Fallback [`ActionTier::PersistentService`] (conservative — unknown
//!    tools are never treated as cached patterns)

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{LazyLock, RwLock};

use crate::tier::ActionTier;

/// Seeded tier registry. Keys are case-sensitive exact tool names.
static DEFAULT_TIER_REGISTRY: LazyLock<HashMap<&'static str, ActionTier>> = LazyLock::new(|| {
    use ActionTier::{
        CachedPattern, EphemeralCompute, Irreversible, PersistentService, SandboxedWorkspace,
    };
    HashMap::from([
        ("read", CachedPattern),
        ("grep", CachedPattern),
        ("find", CachedPattern),
        ("ls", CachedPattern),
        ("web_search", CachedPattern),
        ("web_fetch", CachedPattern),
        ("memory_search", CachedPattern),
        ("memory_get", CachedPattern),
        ("agents_list", CachedPattern),
        ("sessions_list", CachedPattern),
        ("sessions_history", CachedPattern),
        ("session_status", CachedPattern),
        ("write", EphemeralCompute),
        ("edit", EphemeralCompute),
        ("apply_patch", EphemeralCompute),
        ("exec", EphemeralCompute),
        ("bash", EphemeralCompute),
        ("process", EphemeralCompute),
        ("image", EphemeralCompute),
        ("tts", EphemeralCompute),
        ("cron", PersistentService),
        ("gateway", PersistentService),
        ("nodes", PersistentService),
        ("subagents", PersistentService),
        ("sessions_spawn", PersistentService),
        ("browser", SandboxedWorkspace),
        ("canvas", SandboxedWorkspace),
        ("message", Irreversible),
        ("sessions_send", Irreversible),
        ("whatsapp_login", Irreversible),
    ])
});

/// Caller-supplied classification hint, which wins over every registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolAutonomyHint {
    /// Explicit tier for this call.
    pub tier: Option<ActionTier>,
    /// Caller-estimated confidence in `[0, 1]` for the gate's
    /// confidence-weighted downgrade.
    pub confidence: Option<f64>,
}

/// Classifier holding the runtime tier overrides.
///
/// The safety core constructs exactly one of these and hands it to the
/// pipeline; overrides are process-wide through that shared instance.
#[derive(Debug, Default)]
pub struct ActionClassifier {
    overrides: RwLock<HashMap<String, ActionTier>>,
}

impl ActionClassifier {
    /// Create a classifier with no runtime overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a runtime tier override for a tool.
    pub fn register_tool_tier(&self, name: impl Into<String>, tier: ActionTier) {
        let name = name.into();
        tracing::debug!(tool = %name, tier = %tier, "registering tool tier override");
        if let Ok(mut overrides) = self.overrides.write() {
            overrides.insert(name, tier);
        }
    }

    /// Remove a runtime tier override. Returns `true` if one was present.
    pub fn unregister_tool_tier(&self, name: &str) -> bool {
        self.overrides
            .write()
            .map(|mut overrides| overrides.remove(name).is_some())
            .unwrap_or(false)
    }

    /// Read-only merged snapshot of the static registry plus overrides.
    #[must_use]
    pub fn classification_map(&self) -> BTreeMap<String, ActionTier> {
        let mut map: BTreeMap<String, ActionTier> = DEFAULT_TIER_REGISTRY
            .iter()
            .map(|(name, tier)| ((*name).to_string(), *tier))
            .collect();
        if let Ok(overrides) = self.overrides.read() {
            for (name, tier) in overrides.iter() {
                map.insert(name.clone(), *tier);
            }
        }
        map
    }

    /// Classify a tool call. Total: always yields a tier.
    ///
    /// `params` is accepted for interface completeness; classification keys
    /// on the tool name only.
    #[must_use]
    pub fn classify(
        &self,
        tool_name: &str,
        _params: Option<&Value>,
        hint: Option<&ToolAutonomyHint>,
    ) -> ActionTier {
        if let Some(tier) = hint.and_then(|h| h.tier) {
            return tier;
        }
        if let Some(tier) = self
            .overrides
            .read()
            .ok()
            .and_then(|overrides| overrides.get(tool_name).copied())
        {
            return tier;
        }
        DEFAULT_TIER_REGISTRY
            .get(tool_name)
            .copied()
            .unwrap_or(ActionTier::PersistentService)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_registry_classification() {
        let classifier = ActionClassifier::new();
        assert_eq!(
            classifier.classify("read", None, None),
            ActionTier::CachedPattern
        );
        assert_eq!(
            classifier.classify("exec", None, None),
            ActionTier::EphemeralCompute
        );
        assert_eq!(
            classifier.classify("cron", None, None),
            ActionTier::PersistentService
        );
        assert_eq!(
            classifier.classify("browser", None, None),
            ActionTier::SandboxedWorkspace
        );
        assert_eq!(
            classifier.classify("message", None, None),
            ActionTier::Irreversible
        );
    }

    #[test]
    fn test_unknown_tool_falls_back_conservatively() {
        let classifier = ActionClassifier::new();
        assert_eq!(
            classifier.classify("definitely_not_a_tool", None, None),
            ActionTier::PersistentService
        );
    }

    #[test]
    fn test_registry_keys_are_case_sensitive() {
        let classifier = ActionClassifier::new();
        // "Read" is not "read" — falls through to the conservative default.
        assert_eq!(
            classifier.classify("Read", None, None),
            ActionTier::PersistentService
        );
    }

    #[test]
    fn test_hint_wins_over_everything() {
        let classifier = ActionClassifier::new();
        classifier.register_tool_tier("read", ActionTier::Irreversible);

        let hint = ToolAutonomyHint {
            tier: Some(ActionTier::CachedPattern),
            confidence: None,
        };
        assert_eq!(
            classifier.classify("read", None, Some(&hint)),
            ActionTier::CachedPattern
        );
    }

    #[test]
    fn test_runtime_override_beats_static_registry() {
        let classifier = ActionClassifier::new();
        classifier.register_tool_tier("read", ActionTier::EphemeralCompute);
        assert_eq!(
            classifier.classify("read", None, None),
            ActionTier::EphemeralCompute
        );

        assert!(classifier.unregister_tool_tier("read"));
        assert_eq!(
            classifier.classify("read", None, None),
            ActionTier::CachedPattern
        );
        assert!(!classifier.unregister_tool_tier("read"));
    }

    #[test]
    fn test_classification_map_merges_overrides() {
        let classifier = ActionClassifier::new();
        classifier.register_tool_tier("my_tool", ActionTier::SandboxedWorkspace);
        classifier.register_tool_tier("exec", ActionTier::Irreversible);

        let map = classifier.classification_map();
        assert_eq!(map.get("my_tool"), Some(&ActionTier::SandboxedWorkspace));
        assert_eq!(map.get("exec"), Some(&ActionTier::Irreversible));
        assert_eq!(map.get("read"), Some(&ActionTier::CachedPattern));
    }
}
