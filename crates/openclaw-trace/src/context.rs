//! Per-decision trace context.
//!
//! A [`TraceContext`] accumulates gate decisions, tool outcomes, and LLM
//! responses while a decision is in flight, then builds the final
//! [`ReasoningTrace`] exactly once. Recording after finalisation is a
//! silent no-op, and finalising twice writes nothing the second time.

use std::sync::Mutex;
use std::time::Instant;

use openclaw_core::types::{TraceId, truncate_with_ellipsis};

use crate::cost::{CostTracker, LlmUsage};
use crate::trace::{ReasoningTrace, TraceContextInfo, TraceDecision, TraceInput, TraceOutcome};
use crate::writer::TraceWriter;

/// One gate decision recorded on the trace.
#[derive(Debug, Clone)]
pub struct GateDecisionRecord {
    /// The tool the gate evaluated.
    pub tool: String,
    /// Gate decision name (`auto_approve`, `needs_approval`, `denied`).
    pub decision: String,
    /// The gate's reason string.
    pub reason: String,
    /// Tier classification name.
    pub classification: String,
    /// Caller-supplied confidence, if any.
    pub confidence: Option<f64>,
    /// Whether this gate decision required human approval.
    pub approval_required: bool,
    /// How the approval went (`approved`, `rejected`), when one happened.
    pub approval_outcome: Option<String>,
}

/// One tool outcome recorded on the trace.
#[derive(Debug, Clone)]
pub struct ToolOutcomeRecord {
    /// The tool that ran.
    pub tool: String,
    /// Whether it succeeded.
    pub success: bool,
    /// Result text, if any.
    pub result: Option<String>,
    /// Error text, if it failed.
    pub error: Option<String>,
    /// How long the call took.
    pub duration_ms: u64,
}

/// One LLM response recorded on the trace.
#[derive(Debug, Clone)]
pub struct LlmResponseRecord {
    /// Provider stop reason, if reported.
    pub stop_reason: Option<String>,
    /// Model reasoning text, if captured.
    pub reasoning: Option<String>,
    /// Token and cost usage for this response.
    pub usage: LlmUsage,
}

/// Inputs to [`ReasoningTracer::start_decision`].
///
/// [`ReasoningTracer`]: crate::tracer::ReasoningTracer
#[derive(Debug, Clone, Default)]
pub struct StartDecisionParams {
    /// Session the decision belongs to (names the trace file).
    pub session_id: String,
    /// Agent making the decision (names the trace directory).
    pub agent_id: Option<String>,
    /// User message being handled, if any.
    pub user_message: Option<String>,
    /// System event being handled, if any.
    pub system_event: Option<String>,
    /// Parent trace id when this is a subtask.
    pub subtask_of: Option<String>,
    /// Tools available to the agent.
    pub available_tools: Vec<String>,
    /// Active user model identifier.
    pub active_user_model: String,
    /// Character state identifier.
    pub character_state: String,
    /// Autonomy level in force.
    pub autonomy_level: String,
    /// Relevant memory snippets.
    pub relevant_memories: Vec<String>,
}

#[derive(Default)]
struct RecordedState {
    gates: Vec<GateDecisionRecord>,
    tool_outcomes: Vec<ToolOutcomeRecord>,
    llm: Option<LlmResponseRecord>,
    cost: CostTracker,
    finalized: bool,
}

/// Accumulating record of one agent decision.
///
/// Owned by the decision loop until [`TraceContext::finalize`], at which
/// point the built trace transfers to the writer's queue.
pub struct TraceContext {
    trace_id: TraceId,
    params: StartDecisionParams,
    started_at: Instant,
    timestamp: chrono::DateTime<chrono::Utc>,
    state: Mutex<RecordedState>,
    writer: TraceWriter,
    include_reasoning: bool,
    max_result_length: usize,
}

impl TraceContext {
    pub(crate) fn new(
        params: StartDecisionParams,
        writer: TraceWriter,
        include_reasoning: bool,
        max_result_length: usize,
    ) -> Self {
        Self {
            trace_id: TraceId::new(),
            params,
            started_at: Instant::now(),
            timestamp: chrono::Utc::now(),
            state: Mutex::new(RecordedState::default()),
            writer,
            include_reasoning,
            max_result_length,
        }
    }

    /// This decision's trace id, for threading into approval requests.
    #[must_use]
    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// Record a gate decision. No-op after finalisation.
    pub fn record_gate_decision(&self, record: GateDecisionRecord) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.finalized {
            return;
        }
        state.gates.push(record);
    }

    /// Record a tool outcome. No-op after finalisation.
    pub fn record_tool_outcome(&self, outcome: ToolOutcomeRecord) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.finalized {
            return;
        }
        state.tool_outcomes.push(outcome);
    }

    /// Record an LLM response and fold its usage into the cost totals.
    /// No-op after finalisation.
    pub fn record_llm_response(&self, record: LlmResponseRecord) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.finalized {
            return;
        }
        state.cost.record_usage(&record.usage);
        state.llm = Some(record);
    }

    /// Build the trace and hand it to the writer. Idempotent: the second
    /// and later calls do nothing.
    pub fn finalize(&self, success: bool, result: Option<String>, error: Option<String>) {
        let trace = {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if state.finalized {
                return;
            }
            state.finalized = true;
            self.build_trace(&state, success, result, error)
        };

        self.writer.write(
            &self.params.session_id,
            self.params.agent_id.as_deref(),
            &trace,
        );
    }

    fn build_trace(
        &self,
        state: &RecordedState,
        success: bool,
        result: Option<String>,
        error: Option<String>,
    ) -> ReasoningTrace {
        let first_gate = state.gates.first();
        let last_outcome = state.tool_outcomes.last();

        let action = first_gate
            .map(|gate| gate.tool.clone())
            .or_else(|| state.llm.as_ref().and_then(|llm| llm.stop_reason.clone()))
            .unwrap_or_else(|| "response".to_string());

        let reasoning = if self.include_reasoning {
            state
                .llm
                .as_ref()
                .and_then(|llm| llm.reasoning.clone())
                .unwrap_or_default()
        } else {
            String::new()
        };

        let result = result
            .or_else(|| last_outcome.and_then(|outcome| outcome.result.clone()))
            .map(|text| truncate_with_ellipsis(&text, self.max_result_length));
        let error = error.or_else(|| last_outcome.and_then(|outcome| outcome.error.clone()));

        let cost = state.cost.snapshot();

        ReasoningTrace {
            id: self.trace_id.to_string(),
            timestamp: self.timestamp,
            input: TraceInput {
                user_message: self.params.user_message.clone(),
                system_event: self.params.system_event.clone(),
                subtask_of: self.params.subtask_of.clone(),
            },
            context: TraceContextInfo {
                available_tools: self.params.available_tools.clone(),
                active_user_model: self.params.active_user_model.clone(),
                character_state: self.params.character_state.clone(),
                autonomy_level: self.params.autonomy_level.clone(),
                relevant_memories: self.params.relevant_memories.clone(),
            },
            decision: TraceDecision {
                action,
                reasoning,
                confidence: first_gate.and_then(|gate| gate.confidence).unwrap_or(1.0),
                classification: first_gate
                    .map(|gate| gate.classification.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                approval_required: state.gates.iter().any(|gate| gate.approval_required),
                approval_outcome: first_gate.and_then(|gate| gate.approval_outcome.clone()),
            },
            outcome: TraceOutcome {
                success,
                result,
                error,
                duration: u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                token_count: cost.token_count,
                estimated_cost: cost.estimated_cost,
            },
            reflection: None,
        }
    }
}

impl std::fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceContext")
            .field("trace_id", &self.trace_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> (TraceContext, TraceWriter) {
        let writer = TraceWriter::new(dir.path());
        let params = StartDecisionParams {
            session_id: "session".to_string(),
            agent_id: Some("main".to_string()),
            user_message: Some("run the tests".to_string()),
            autonomy_level: "low".to_string(),
            ..StartDecisionParams::default()
        };
        (
            TraceContext::new(params, writer.clone(), true, 2000),
            writer,
        )
    }

    fn gate(tool: &str, confidence: Option<f64>) -> GateDecisionRecord {
        GateDecisionRecord {
            tool: tool.to_string(),
            decision: "auto_approve".to_string(),
            reason: "tier auto-approved".to_string(),
            classification: "ephemeral_compute".to_string(),
            confidence,
            approval_required: false,
            approval_outcome: None,
        }
    }

    async fn written(dir: &TempDir, writer: &TraceWriter) -> Vec<ReasoningTrace> {
        writer.flush().await;
        let path = dir.path().join("main").join("session.jsonl");
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Vec::new();
        };
        contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_finalize_writes_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let (context, writer) = context(&dir);

        context.record_gate_decision(gate("exec", Some(0.8)));
        context.finalize(true, Some("done".to_string()), None);

        let traces = written(&dir, &writer).await;
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].decision.action, "exec");
        assert_eq!(traces[0].decision.classification, "ephemeral_compute");
        assert!((traces[0].decision.confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(traces[0].outcome.result.as_deref(), Some("done"));
        assert!(traces[0].outcome.success);
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (context, writer) = context(&dir);

        context.finalize(true, None, None);
        context.finalize(false, None, Some("again".to_string()));

        let traces = written(&dir, &writer).await;
        assert_eq!(traces.len(), 1);
        assert!(traces[0].outcome.success);
    }

    #[tokio::test]
    async fn test_recording_after_finalize_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (context, writer) = context(&dir);

        context.finalize(true, None, None);
        context.record_gate_decision(gate("exec", None));
        context.record_llm_response(LlmResponseRecord {
            stop_reason: Some("end_turn".to_string()),
            reasoning: Some("late".to_string()),
            usage: LlmUsage {
                prompt_tokens: 10,
                completion_tokens: 10,
                cost_usd: 1.0,
            },
        });

        let traces = written(&dir, &writer).await;
        assert_eq!(traces[0].decision.action, "response");
        assert_eq!(traces[0].outcome.token_count, 0);
    }

    #[tokio::test]
    async fn test_action_precedence_gate_then_stop_reason_then_response() {
        let dir = tempfile::tempdir().unwrap();

        // No gate, but an LLM stop reason.
        let (context, writer) = context(&dir);
        context.record_llm_response(LlmResponseRecord {
            stop_reason: Some("end_turn".to_string()),
            reasoning: Some("just answering".to_string()),
            usage: LlmUsage::default(),
        });
        context.finalize(true, None, None);
        let traces = written(&dir, &writer).await;
        assert_eq!(traces[0].decision.action, "end_turn");
        assert_eq!(traces[0].decision.reasoning, "just answering");
        // No gate record: confidence defaults to 1, classification unknown.
        assert!((traces[0].decision.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(traces[0].decision.classification, "unknown");
    }

    #[tokio::test]
    async fn test_result_truncated_with_ellipsis() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TraceWriter::new(dir.path());
        let params = StartDecisionParams {
            session_id: "session".to_string(),
            agent_id: Some("main".to_string()),
            ..StartDecisionParams::default()
        };
        let context = TraceContext::new(params, writer.clone(), true, 10);

        context.finalize(true, Some("x".repeat(50)), None);

        let traces = written(&dir, &writer).await;
        let result = traces[0].outcome.result.as_deref().unwrap();
        assert_eq!(result.chars().count(), 11);
        assert!(result.ends_with('\u{2026}'));
    }

    #[tokio::test]
    async fn test_reasoning_excluded_when_configured_off() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TraceWriter::new(dir.path());
        let params = StartDecisionParams {
            session_id: "session".to_string(),
            agent_id: Some("main".to_string()),
            ..StartDecisionParams::default()
        };
        let context = TraceContext::new(params, writer.clone(), false, 2000);

        context.record_llm_response(LlmResponseRecord {
            stop_reason: None,
            reasoning: Some("private chain of thought".to_string()),
            usage: LlmUsage::default(),
        });
        context.finalize(true, None, None);

        let traces = written(&dir, &writer).await;
        assert!(traces[0].decision.reasoning.is_empty());
    }

    #[tokio::test]
    async fn test_approval_fields_come_from_gate_records() {
        let dir = tempfile::tempdir().unwrap();
        let (context, writer) = context(&dir);

        context.record_gate_decision(GateDecisionRecord {
            tool: "exec".to_string(),
            decision: "needs_approval".to_string(),
            reason: "requires approval".to_string(),
            classification: "ephemeral_compute".to_string(),
            confidence: None,
            approval_required: true,
            approval_outcome: Some("approved".to_string()),
        });
        context.record_tool_outcome(ToolOutcomeRecord {
            tool: "exec".to_string(),
            success: true,
            result: Some("ok".to_string()),
            error: None,
            duration_ms: 5,
        });
        context.finalize(true, None, None);

        let traces = written(&dir, &writer).await;
        assert!(traces[0].decision.approval_required);
        assert_eq!(traces[0].decision.approval_outcome.as_deref(), Some("approved"));
        // Result falls back to the recorded tool outcome.
        assert_eq!(traces[0].outcome.result.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_cost_accumulates_across_responses() {
        let dir = tempfile::tempdir().unwrap();
        let (context, writer) = context(&dir);

        for _ in 0..2 {
            context.record_llm_response(LlmResponseRecord {
                stop_reason: None,
                reasoning: None,
                usage: LlmUsage {
                    prompt_tokens: 100,
                    completion_tokens: 50,
                    cost_usd: 0.001,
                },
            });
        }
        context.finalize(true, None, None);

        let traces = written(&dir, &writer).await;
        assert_eq!(traces[0].outcome.token_count, 300);
        assert!((traces[0].outcome.estimated_cost - 0.002).abs() < 1e-9);
    }
}
