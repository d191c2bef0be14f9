//! The per-tool-call safety pipeline.
//!
//! Every tool call traverses, in order: before-hook, filesystem boundary,
//! classifier, auto-approve rules, autonomy gate, approval manager (when
//! required), execution, output sanitisation, trace recording, after-hook.
//! Steps for one call are strictly sequential; concurrent calls interleave
//! freely, each on its own trace context and approval record.

use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use openclaw_approval::{
    ApprovalDecision, ApprovalManager, ApprovalRequest, AutoApproveStore, DEFAULT_AGENT_ID,
    normalize_tool_name,
};
use openclaw_autonomy::{
    ActionClassifier, ActionTier, AutonomyLevel, FilesystemBoundary, GateDecision, GateEvaluation,
    ProgressionTracker, ToolAutonomyHint, evaluate_gate, parse_autonomy_level,
};
use openclaw_core::config::{ProgressionConfig, SafetyConfig};
use openclaw_core::CoreResult;
use openclaw_core::paths::state_dir;
use openclaw_scan::{DataFlowValidator, OutputScanner, ToolOutputSanitizer};
use openclaw_trace::{
    GateDecisionRecord, ReasoningTracer, ToolOutcomeRecord, TraceContext, create_reasoning_tracer,
};

use crate::error::{PipelineError, PipelineResult};
use crate::hooks::{HookVerdict, ToolExecutor, ToolHooks, UpdateSink};

/// Everything the pipeline needs, assembled once at startup.
///
/// This is the construction root for the safety core: tier overrides, the
/// approval manager, and the persisted stores all live here rather than in
/// ambient globals.
pub struct SafetyCore {
    /// Autonomy level in force.
    pub level: AutonomyLevel,
    /// Confidence threshold for the gate downgrade.
    pub confidence_threshold: f64,
    /// Timeout for pending approvals.
    pub approval_timeout_ms: u64,
    /// Progression guard configuration.
    pub progression_config: ProgressionConfig,
    /// The action classifier (static registry + runtime overrides).
    pub classifier: ActionClassifier,
    /// The filesystem boundary.
    pub boundary: FilesystemBoundary,
    /// Persistent auto-approve rules.
    pub rules: AutoApproveStore,
    /// Per-agent approval track record.
    pub progression: ProgressionTracker,
    /// Tool-output sanitiser.
    pub sanitizer: ToolOutputSanitizer,
    /// Outbound output scanner.
    pub output_scanner: OutputScanner,
    /// Outbound data-flow validator.
    pub data_flow: DataFlowValidator,
    /// Reasoning tracer, when diagnostics enable it.
    pub tracer: Option<ReasoningTracer>,
    approval: Option<Arc<ApprovalManager>>,
}

impl SafetyCore {
    /// Assemble the core against the default state directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the state directory cannot be resolved.
    pub fn new(config: &SafetyConfig) -> CoreResult<Self> {
        let dir = state_dir()?;
        Ok(Self::with_state_dir(config, &dir))
    }

    /// Assemble the core against an explicit state directory (tests,
    /// embedded deployments).
    #[must_use]
    pub fn with_state_dir(config: &SafetyConfig, dir: &Path) -> Self {
        let mut diagnostics = config.diagnostics.clone();
        if diagnostics.reasoning_trace.base_dir.is_none() {
            diagnostics.reasoning_trace.base_dir =
                Some(dir.join("traces").to_string_lossy().into_owned());
        }

        Self {
            level: parse_autonomy_level(Some(&config.autonomy.level)),
            confidence_threshold: config.autonomy.confidence_threshold,
            approval_timeout_ms: config.autonomy.approval_timeout_ms,
            progression_config: config.autonomy.progression.clone(),
            classifier: ActionClassifier::new(),
            boundary: FilesystemBoundary::new(&config.security.filesystem),
            rules: AutoApproveStore::new(dir.join(openclaw_approval::rules::RULES_FILE_NAME)),
            progression: ProgressionTracker::new(
                dir.join(openclaw_autonomy::progression::PROGRESSION_FILE_NAME),
            ),
            sanitizer: ToolOutputSanitizer::new(config.security.sensitive_patterns.clone()),
            output_scanner: OutputScanner::new(
                &config.security.output_scanning,
                config.security.sensitive_patterns.clone(),
            ),
            data_flow: DataFlowValidator::new(&config.security.data_flow),
            tracer: create_reasoning_tracer(&diagnostics),
            approval: None,
        }
    }

    /// Install the approval manager.
    ///
    /// Production deployments must do this before the first tool call;
    /// without it the pipeline fails open on approvals, loudly.
    #[must_use]
    pub fn with_approval_manager(mut self, manager: Arc<ApprovalManager>) -> Self {
        self.approval = Some(manager);
        self
    }

    /// The installed approval manager, if any.
    #[must_use]
    pub fn approval_manager(&self) -> Option<&Arc<ApprovalManager>> {
        self.approval.as_ref()
    }
}

impl std::fmt::Debug for SafetyCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyCore")
            .field("level", &self.level)
            .field("has_approval_manager", &self.approval.is_some())
            .finish_non_exhaustive()
    }
}

/// One tool call entering the pipeline.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    /// Tool name as issued by the model.
    pub tool_name: String,
    /// Opaque tool parameters.
    pub params: Value,
    /// Correlation id for the call.
    pub tool_call_id: String,
    /// Issuing agent; defaults to `"main"`.
    pub agent_id: Option<String>,
    /// Session the call belongs to, threaded into approval requests.
    pub session_key: Option<String>,
    /// Caller-supplied classification hint.
    pub hint: Option<ToolAutonomyHint>,
    /// Trace context to record decisions into, when tracing.
    pub trace: Option<Arc<TraceContext>>,
    /// Sink for streaming tool updates.
    pub updates: Option<UpdateSink>,
    /// Abort signal for the call.
    pub cancel: CancellationToken,
}

impl ToolCallRequest {
    /// A plain request with no hint, trace, or update sink.
    #[must_use]
    pub fn new(
        tool_name: impl Into<String>,
        params: Value,
        tool_call_id: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            params,
            tool_call_id: tool_call_id.into(),
            agent_id: None,
            session_key: None,
            hint: None,
            trace: None,
            updates: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// The pipeline itself.
pub struct ToolPipeline {
    core: Arc<SafetyCore>,
    hooks: Option<Arc<dyn ToolHooks>>,
    executor: Arc<dyn ToolExecutor>,
}

impl ToolPipeline {
    /// Build a pipeline over an assembled core and executor.
    #[must_use]
    pub fn new(core: Arc<SafetyCore>, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            core,
            hooks: None,
            executor,
        }
    }

    /// Attach the external hook runtime.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn ToolHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// The core this pipeline runs against.
    #[must_use]
    pub fn core(&self) -> &Arc<SafetyCore> {
        &self.core
    }

    /// Run one tool call through the full pipeline.
    ///
    /// Tool execution failures come back as structured
    /// `{status: "error", tool, error}` values; only safety refusals and
    /// aborts surface as [`PipelineError`]s.
    ///
    /// # Errors
    ///
    /// See [`PipelineError`] for the taxonomy.
    pub async fn dispatch(&self, request: ToolCallRequest) -> PipelineResult<Value> {
        let tool = request.tool_name.clone();
        let mut params = request.params.clone();

        // 1. Before-hook may adjust params or veto the call.
        if let Some(hooks) = &self.hooks {
            match hooks.before_tool_call(&tool, &params).await {
                HookVerdict::Block { reason } => {
                    return Err(PipelineError::BeforeHookBlocked { reason });
                },
                HookVerdict::Proceed {
                    adjusted_params: Some(adjusted),
                } => params = adjusted,
                HookVerdict::Proceed {
                    adjusted_params: None,
                } => {},
            }
        }

        // 2. Filesystem boundary.
        if params.is_object()
            && let Some(check) = self.core.boundary.validate_tool_access(&tool, &params)
            && !check.allowed
        {
            return Err(PipelineError::FsBoundary {
                reason: check.reason,
            });
        }

        // 3. Classification.
        let tier = self
            .core
            .classifier
            .classify(&tool, Some(&params), request.hint.as_ref());

        // 4–5. Rules, gate, approval.
        self.authorize(&request, &tool, &params, tier).await?;

        // Pre-execution abort check: a caller that already gave up keeps
        // its cancellation semantics.
        if request.cancel.is_cancelled() {
            return Err(PipelineError::Aborted { tool });
        }

        // 6. Execution.
        let started = std::time::Instant::now();
        let outcome = self
            .executor
            .execute(
                &request.tool_call_id,
                &tool,
                &params,
                request.updates.clone(),
                &request.cancel,
            )
            .await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(mut result) => {
                // 7. Sanitise the output field before it re-enters context.
                let sanitized = result
                    .get("output")
                    .and_then(Value::as_str)
                    .map(|output| self.core.sanitizer.sanitize(output, Some(&tool)));
                if let Some(sanitized) = sanitized
                    && sanitized.modified
                    && let Some(object) = result.as_object_mut()
                {
                    object.insert("output".to_string(), Value::String(sanitized.sanitized));
                }

                // 8. Trace, after-hook, return.
                if let Some(trace) = &request.trace {
                    trace.record_tool_outcome(ToolOutcomeRecord {
                        tool: tool.clone(),
                        success: true,
                        result: result
                            .get("output")
                            .and_then(Value::as_str)
                            .map(ToString::to_string),
                        error: None,
                        duration_ms,
                    });
                }
                self.run_after_hook(&tool, Some(&result), None).await;
                Ok(result)
            },
            Err(err) => {
                // 9. Aborts propagate unchanged; everything else becomes a
                // structured error result.
                if request.cancel.is_cancelled() || err.aborted {
                    return Err(PipelineError::Aborted { tool });
                }

                tracing::error!(tool = %tool, error = %err, "tool execution failed");
                if let Some(trace) = &request.trace {
                    trace.record_tool_outcome(ToolOutcomeRecord {
                        tool: tool.clone(),
                        success: false,
                        result: None,
                        error: Some(err.message.clone()),
                        duration_ms,
                    });
                }
                self.run_after_hook(&tool, None, Some(&err.message)).await;
                Ok(json!({
                    "status": "error",
                    "tool": tool,
                    "error": err.message,
                }))
            },
        }
    }

    /// Steps 4 and 5: auto-approve rules, gate evaluation, approval.
    async fn authorize(
        &self,
        request: &ToolCallRequest,
        tool: &str,
        params: &Value,
        tier: ActionTier,
    ) -> PipelineResult<()> {
        let agent_id = request.agent_id.as_deref().unwrap_or(DEFAULT_AGENT_ID);
        let normalized = normalize_tool_name(tool);

        if let Some(rule) = self.core.rules.check(&normalized, tier, Some(agent_id)) {
            tracing::debug!(tool, pattern = %rule.tool_pattern, "auto-approved by stored rule");
            record_gate(
                request.trace.as_deref(),
                tool,
                GateDecision::AutoApprove.as_str(),
                &format!("auto-approved by stored rule '{}'", rule.tool_pattern),
                tier,
                None,
                false,
                None,
            );
            return Ok(());
        }

        let confidence = request.hint.as_ref().and_then(|hint| hint.confidence);
        let eval = evaluate_gate(self.core.level, tier, confidence, self.core.confidence_threshold);

        match eval.decision {
            GateDecision::Denied => {
                record_gate(
                    request.trace.as_deref(),
                    tool,
                    eval.decision.as_str(),
                    &eval.reason,
                    tier,
                    eval.confidence,
                    false,
                    None,
                );
                Err(PipelineError::GateDenied { reason: eval.reason })
            },
            GateDecision::AutoApprove => {
                record_gate(
                    request.trace.as_deref(),
                    tool,
                    eval.decision.as_str(),
                    &eval.reason,
                    tier,
                    eval.confidence,
                    false,
                    None,
                );
                Ok(())
            },
            GateDecision::NeedsApproval => {
                self.request_approval(request, tool, &normalized, params, tier, &eval, agent_id)
                    .await
            },
        }
    }

    /// Step 5 proper: suspend the call on the approval manager.
    #[allow(clippy::too_many_arguments)]
    async fn request_approval(
        &self,
        request: &ToolCallRequest,
        tool: &str,
        normalized: &str,
        params: &Value,
        tier: ActionTier,
        eval: &GateEvaluation,
        agent_id: &str,
    ) -> PipelineResult<()> {
        let Some(manager) = &self.core.approval else {
            // Non-gateway contexts (CLI, tests) may run without a manager;
            // production must install one before the first tool call.
            tracing::warn!(
                tool,
                tier = %tier,
                "approval required but no approval manager is initialised; proceeding"
            );
            record_gate(
                request.trace.as_deref(),
                tool,
                GateDecision::NeedsApproval.as_str(),
                &eval.reason,
                tier,
                eval.confidence,
                true,
                Some("approved"),
            );
            return Ok(());
        };

        let mut approval_request =
            ApprovalRequest::new(tool, params, tier, eval.level, eval.reason.clone())
                .with_agent_id(agent_id);
        if let Some(confidence) = eval.confidence {
            approval_request = approval_request.with_confidence(confidence);
        }
        if let Some(session_key) = &request.session_key {
            approval_request = approval_request.with_session_key(session_key);
        }
        if let Some(trace) = &request.trace {
            approval_request = approval_request.with_trace_id(trace.trace_id().clone());
        }

        let timeout_ms = self.core.approval_timeout_ms;
        let record = manager.create(approval_request, timeout_ms, None);
        let future = match manager.register(record, timeout_ms) {
            Ok(future) => future,
            Err(err) => {
                tracing::warn!(tool, error = %err, "approval registration failed");
                return Err(PipelineError::ApprovalDenied {
                    tool: tool.to_string(),
                });
            },
        };

        let decision = tokio::select! {
            decision = future.wait() => decision,
            () = request.cancel.cancelled() => {
                // The pending record stays; it will be resolved or time out
                // on its own, which is harmless.
                return Err(PipelineError::Aborted { tool: tool.to_string() });
            },
        };

        let record_outcome = |outcome: &str| {
            record_gate(
                request.trace.as_deref(),
                tool,
                GateDecision::NeedsApproval.as_str(),
                &eval.reason,
                tier,
                eval.confidence,
                true,
                Some(outcome),
            );
        };

        match decision {
            Some(ApprovalDecision::AllowOnce) => {
                self.core.progression.record_approval_outcome(true, agent_id);
                record_outcome("approved");
                Ok(())
            },
            Some(ApprovalDecision::AllowAlways) => {
                if let Err(err) = self.core.rules.add(normalized, tier, Some(agent_id)) {
                    tracing::warn!(tool, error = %err, "failed to persist auto-approve rule");
                }
                self.core.progression.record_approval_outcome(true, agent_id);
                record_outcome("approved");
                Ok(())
            },
            Some(ApprovalDecision::Deny) => {
                self.core.progression.record_approval_outcome(false, agent_id);
                record_outcome("rejected");
                Err(PipelineError::ApprovalDenied {
                    tool: tool.to_string(),
                })
            },
            None => {
                self.core.progression.record_approval_outcome(false, agent_id);
                record_outcome("rejected");
                Err(PipelineError::ApprovalTimedOut {
                    tool: tool.to_string(),
                })
            },
        }
    }

    /// After-hooks are best-effort; nothing they do fails the call.
    async fn run_after_hook(&self, tool: &str, result: Option<&Value>, error: Option<&str>) {
        if let Some(hooks) = &self.hooks {
            hooks.after_tool_call(tool, result, error).await;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn record_gate(
    trace: Option<&TraceContext>,
    tool: &str,
    decision: &str,
    reason: &str,
    tier: ActionTier,
    confidence: Option<f64>,
    approval_required: bool,
    approval_outcome: Option<&str>,
) {
    if let Some(trace) = trace {
        trace.record_gate_decision(GateDecisionRecord {
            tool: tool.to_string(),
            decision: decision.to_string(),
            reason: reason.to_string(),
            classification: tier.as_str().to_string(),
            confidence,
            approval_required,
            approval_outcome: approval_outcome.map(ToString::to_string),
        });
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
