//! Configuration surface consumed by the safety core.
//!
//! Only the keys the core actually reads are modelled here; everything else
//! in the host agent's configuration is opaque to this workspace. Every
//! struct implements [`Default`] with production-safe values so that an
//! absent section behaves identically to an explicitly-defaulted one.

use serde::{Deserialize, Serialize};

/// Root configuration for the safety core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Autonomy level, confidence threshold, approval timeout, progression.
    pub autonomy: AutonomyConfig,
    /// Filesystem boundary, data-flow, and output-scanning policy.
    pub security: SecurityConfig,
    /// Reasoning-trace diagnostics.
    pub diagnostics: DiagnosticsConfig,
}

/// Autonomy policy knobs (`autonomy.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutonomyConfig {
    /// Autonomy level: `"low"`, `"medium"`, or `"high"`. Anything else is
    /// treated as `"low"`.
    pub level: String,
    /// Minimum confidence below which auto-approvals are downgraded to
    /// approval-required.
    pub confidence_threshold: f64,
    /// How long a pending approval waits before timing out.
    pub approval_timeout_ms: u64,
    /// Adaptive-trust progression settings.
    pub progression: ProgressionConfig,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            level: "low".to_string(),
            confidence_threshold: 0.7,
            approval_timeout_ms: 120_000,
            progression: ProgressionConfig::default(),
        }
    }
}

/// Autonomy progression settings (`autonomy.progression.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Whether upgrade proposals are enabled at all.
    pub enabled: bool,
    /// Minimum number of recorded decisions before an upgrade is proposed.
    pub min_approvals: u64,
    /// Minimum approval rate (approvals / total) required for an upgrade.
    pub min_approval_rate: f64,
    /// Days to wait between surfaced proposals.
    pub cooldown_days: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_approvals: 50,
            min_approval_rate: 0.95,
            cooldown_days: 7.0,
        }
    }
}

/// Security policy sections (`security.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Filesystem readable/writable/denied scopes.
    pub filesystem: FilesystemBoundaryConfig,
    /// Outbound data-flow policy.
    pub data_flow: DataFlowConfig,
    /// Extra sensitive-data regex patterns (invalid entries are skipped).
    pub sensitive_patterns: Vec<String>,
    /// Outbound output scanning.
    pub output_scanning: OutputScanningConfig,
}

/// Filesystem boundary scopes (`security.filesystem.*`).
///
/// Paths may use a leading `~`; they are home-expanded and absolutised when
/// the boundary is constructed. Denied paths dominate both other lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemBoundaryConfig {
    /// Roots readable by read-classified tools.
    pub readable: Vec<String>,
    /// Roots writable by write-classified tools.
    pub writable: Vec<String>,
    /// Paths no tool may touch, regardless of the other lists.
    pub denied: Vec<String>,
}

impl Default for FilesystemBoundaryConfig {
    fn default() -> Self {
        Self {
            readable: vec!["~".to_string()],
            writable: vec!["~/.openclaw/".to_string()],
            denied: vec![
                "~/.ssh/".to_string(),
                "~/.gnupg/".to_string(),
                "~/.aws/".to_string(),
                "~/.config/gcloud/".to_string(),
                "~/.docker/".to_string(),
                "~/.kube/".to_string(),
                "~/.netrc".to_string(),
                "~/.npmrc".to_string(),
                "~/.pypirc".to_string(),
            ],
        }
    }
}

/// Outbound data-flow policy (`security.dataFlow.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataFlowConfig {
    /// Providers data may be sent to. Empty means any provider is allowed.
    pub allowed_providers: Vec<String>,
    /// Extra redaction regex patterns applied at the outbound boundary.
    pub redaction_patterns: Vec<String>,
}

/// Output scanning settings (`security.outputScanning.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputScanningConfig {
    /// Whether outbound agent text is scanned at all.
    pub enabled: bool,
    /// System-prompt fragments whose presence in output is flagged.
    /// Empty means the built-in defaults are used.
    pub system_prompt_fragments: Vec<String>,
}

impl Default for OutputScanningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            system_prompt_fragments: Vec::new(),
        }
    }
}

/// Diagnostics sections (`diagnostics.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Reasoning-trace recording.
    pub reasoning_trace: ReasoningTraceConfig,
}

/// Reasoning-trace settings (`diagnostics.reasoningTrace.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningTraceConfig {
    /// Whether traces are recorded at all. Off by default.
    pub enabled: bool,
    /// Base directory for trace files. Defaults to `<state dir>/traces`.
    pub base_dir: Option<String>,
    /// Whether LLM reasoning text is included in trace records.
    pub include_reasoning: bool,
    /// Maximum stored length of a tool result before truncation.
    pub max_result_length: usize,
}

impl Default for ReasoningTraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_dir: None,
            include_reasoning: true,
            max_result_length: 2000,
        }
    }
}
