//! The reasoning tracer — construction root for trace recording.
//!
//! A tracer exists only when `diagnostics.reasoningTrace.enabled` is true;
//! callers hold an `Option<ReasoningTracer>` and skip recording when it is
//! `None`.

use std::path::PathBuf;

use openclaw_core::config::DiagnosticsConfig;
use openclaw_core::paths::{expand_home, state_dir};

use crate::context::{StartDecisionParams, TraceContext};
use crate::writer::TraceWriter;

/// Subdirectory of the state dir holding trace files by default.
const TRACES_DIR_NAME: &str = "traces";

/// Records one [`TraceContext`] per agent decision.
#[derive(Debug, Clone)]
pub struct ReasoningTracer {
    writer: TraceWriter,
    include_reasoning: bool,
    max_result_length: usize,
}

impl ReasoningTracer {
    /// Start recording one decision.
    #[must_use]
    pub fn start_decision(&self, params: StartDecisionParams) -> TraceContext {
        TraceContext::new(
            params,
            self.writer.clone(),
            self.include_reasoning,
            self.max_result_length,
        )
    }

    /// Await everything recorded so far reaching disk.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// The writer backing this tracer (for querying the same base dir).
    #[must_use]
    pub fn writer(&self) -> &TraceWriter {
        &self.writer
    }
}

/// Build a tracer from configuration.
///
/// Returns `None` when tracing is disabled, or when no base directory can
/// be resolved (in which case a warning is logged; the agent runs without
/// traces rather than failing).
///
/// Must be called within a tokio runtime.
#[must_use]
pub fn create_reasoning_tracer(config: &DiagnosticsConfig) -> Option<ReasoningTracer> {
    let trace_config = &config.reasoning_trace;
    if !trace_config.enabled {
        return None;
    }

    let base_dir: PathBuf = match &trace_config.base_dir {
        Some(dir) => expand_home(dir),
        None => match state_dir() {
            Ok(dir) => dir.join(TRACES_DIR_NAME),
            Err(err) => {
                tracing::warn!(error = %err, "reasoning trace enabled but no base dir; tracing off");
                return None;
            },
        },
    };

    Some(ReasoningTracer {
        writer: TraceWriter::new(base_dir),
        include_reasoning: trace_config.include_reasoning,
        max_result_length: trace_config.max_result_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use openclaw_core::config::ReasoningTraceConfig;

    fn config(enabled: bool, base_dir: Option<String>) -> DiagnosticsConfig {
        DiagnosticsConfig {
            reasoning_trace: ReasoningTraceConfig {
                enabled,
                base_dir,
                ..ReasoningTraceConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn test_disabled_config_yields_no_tracer() {
        assert!(create_reasoning_tracer(&config(false, None)).is_none());
    }

    #[tokio::test]
    async fn test_enabled_config_yields_tracer() {
        let dir = tempfile::tempdir().unwrap();
        let tracer = create_reasoning_tracer(&config(
            true,
            Some(dir.path().to_string_lossy().into_owned()),
        ))
        .unwrap();

        let context = tracer.start_decision(StartDecisionParams {
            session_id: "s".to_string(),
            ..StartDecisionParams::default()
        });
        context.finalize(true, None, None);
        tracer.flush().await;

        assert!(dir.path().join("default").join("s.jsonl").exists());
    }
}
