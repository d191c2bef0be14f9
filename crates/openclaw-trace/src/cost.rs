//! Per-decision token and cost accounting.
//!
//! The tracker accumulates usage reported with each LLM response; the
//! finalised trace takes one snapshot. Pricing is the provider router's
//! concern — callers report cost figures, nothing is computed from a
//! catalog here.

use serde::{Deserialize, Serialize};

/// Usage reported for one LLM response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Prompt tokens consumed.
    pub prompt_tokens: u64,
    /// Completion tokens produced.
    pub completion_tokens: u64,
    /// Cost in USD as reported by the provider router.
    pub cost_usd: f64,
}

impl LlmUsage {
    /// Total tokens in this usage report.
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A point-in-time view of accumulated usage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostSnapshot {
    /// Total tokens across all recorded responses.
    pub token_count: u64,
    /// Total estimated cost in USD.
    pub estimated_cost: f64,
}

/// Accumulator for one decision's LLM usage.
///
/// Not internally synchronised; the owning [`TraceContext`] guards it.
///
/// [`TraceContext`]: crate::context::TraceContext
#[derive(Debug, Default)]
pub struct CostTracker {
    token_count: u64,
    estimated_cost: f64,
}

impl CostTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one usage report into the totals.
    pub fn record_usage(&mut self, usage: &LlmUsage) {
        self.token_count += usage.total_tokens();
        self.estimated_cost += usage.cost_usd;
    }

    /// Snapshot the accumulated totals.
    #[must_use]
    pub fn snapshot(&self) -> CostSnapshot {
        CostSnapshot {
            token_count: self.token_count,
            estimated_cost: self.estimated_cost,
        }
    }
}
