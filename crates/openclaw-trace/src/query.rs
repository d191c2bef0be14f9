//! Trace querying over the JSONL files.
//!
//! Files are streamed line by line; malformed lines are skipped rather than
//! failing the query, since other processes may be mid-append. Filtering
//! happens per line, then the surviving set is sorted and paged.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;

use crate::error::TraceResult;
use crate::trace::ReasoningTrace;

/// Sort key for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceSortKey {
    /// Sort by the trace timestamp (the default).
    #[default]
    Timestamp,
    /// Sort by estimated cost.
    Cost,
    /// Sort by decision duration.
    Duration,
}

/// Query parameters. The default is "latest 50 traces".
#[derive(Debug, Clone)]
pub struct TraceQueryParams {
    /// Case-insensitive keyword matched against the user message, action,
    /// and reasoning.
    pub keyword: Option<String>,
    /// Exact classification filter.
    pub classification: Option<String>,
    /// Only traces that are subtasks of this parent trace id.
    pub subtask_of: Option<String>,
    /// Inclusive lower bound on the trace timestamp.
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the trace timestamp.
    pub until: Option<DateTime<Utc>>,
    /// Sort key.
    pub sort_by: TraceSortKey,
    /// Ascending order when true; default is descending.
    pub ascending: bool,
    /// Results to skip after sorting.
    pub offset: usize,
    /// Maximum results to return.
    pub limit: usize,
}

impl Default for TraceQueryParams {
    fn default() -> Self {
        Self {
            keyword: None,
            classification: None,
            subtask_of: None,
            since: None,
            until: None,
            sort_by: TraceSortKey::Timestamp,
            ascending: false,
            offset: 0,
            limit: 50,
        }
    }
}

impl TraceQueryParams {
    fn matches(&self, trace: &ReasoningTrace) -> bool {
        if let Some(keyword) = &self.keyword {
            let keyword = keyword.to_lowercase();
            let haystacks = [
                trace.input.user_message.as_deref().unwrap_or(""),
                &trace.decision.action,
                &trace.decision.reasoning,
            ];
            if !haystacks
                .iter()
                .any(|hay| hay.to_lowercase().contains(&keyword))
            {
                return false;
            }
        }
        if let Some(classification) = &self.classification
            && &trace.decision.classification != classification
        {
            return false;
        }
        if let Some(parent) = &self.subtask_of
            && trace.input.subtask_of.as_deref() != Some(parent.as_str())
        {
            return false;
        }
        if let Some(since) = self.since
            && trace.timestamp < since
        {
            return false;
        }
        if let Some(until) = self.until
            && trace.timestamp > until
        {
            return false;
        }
        true
    }
}

/// Read-side access to a trace base directory.
#[derive(Debug, Clone)]
pub struct TraceQuery {
    base_dir: PathBuf,
}

impl TraceQuery {
    /// Create a query handle over a base directory.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Run a filtered, sorted, paged query across every trace file.
    ///
    /// A missing base directory yields an empty result, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only when directory listing fails for an existing
    /// directory.
    pub async fn query(&self, params: &TraceQueryParams) -> TraceResult<Vec<ReasoningTrace>> {
        let mut traces = Vec::new();
        self.visit_lines(|trace| {
            if params.matches(&trace) {
                traces.push(trace);
            }
            true
        })
        .await?;

        let compare = |a: &ReasoningTrace, b: &ReasoningTrace| -> Ordering {
            match params.sort_by {
                TraceSortKey::Timestamp => a.timestamp.cmp(&b.timestamp),
                TraceSortKey::Cost => a
                    .outcome
                    .estimated_cost
                    .partial_cmp(&b.outcome.estimated_cost)
                    .unwrap_or(Ordering::Equal),
                TraceSortKey::Duration => a.outcome.duration.cmp(&b.outcome.duration),
            }
        };
        traces.sort_by(|a, b| {
            if params.ascending {
                compare(a, b)
            } else {
                compare(b, a)
            }
        });

        Ok(traces
            .into_iter()
            .skip(params.offset)
            .take(params.limit)
            .collect())
    }

    /// Find one trace by id, scanning files until it turns up.
    ///
    /// # Errors
    ///
    /// Returns an error only when directory listing fails.
    pub async fn get_trace(&self, id: &str) -> TraceResult<Option<ReasoningTrace>> {
        let mut found = None;
        self.visit_lines(|trace| {
            if trace.id == id {
                found = Some(trace);
                return false;
            }
            true
        })
        .await?;
        Ok(found)
    }

    /// All direct subtasks of a parent trace, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error only when directory listing fails.
    pub async fn get_subtasks(&self, parent_id: &str) -> TraceResult<Vec<ReasoningTrace>> {
        self.query(&TraceQueryParams {
            subtask_of: Some(parent_id.to_string()),
            ascending: true,
            limit: 1000,
            ..TraceQueryParams::default()
        })
        .await
    }

    /// Stream every parseable trace line to `visit`; a `false` return stops
    /// the walk early.
    async fn visit_lines<F>(&self, mut visit: F) -> TraceResult<()>
    where
        F: FnMut(ReasoningTrace) -> bool,
    {
        let Ok(mut agent_dirs) = tokio::fs::read_dir(&self.base_dir).await else {
            return Ok(());
        };

        while let Some(agent_dir) = agent_dirs.next_entry().await? {
            if !agent_dir.file_type().await?.is_dir() {
                continue;
            }
            let mut files = tokio::fs::read_dir(agent_dir.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().is_none_or(|ext| ext != "jsonl") {
                    continue;
                }
                let Ok(handle) = tokio::fs::File::open(&path).await else {
                    continue;
                };
                let mut lines = tokio::io::BufReader::new(handle).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let Ok(trace) = serde_json::from_str::<ReasoningTrace>(&line) else {
                        continue;
                    };
                    if !visit(trace) {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{TraceContextInfo, TraceDecision, TraceInput, TraceOutcome};
    use crate::writer::TraceWriter;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn trace(id: &str, minute: u32, cost: f64, duration: u64) -> ReasoningTrace {
        ReasoningTrace {
            id: id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 7, 1, 12, minute, 0).unwrap(),
            input: TraceInput {
                user_message: Some(format!("please handle task {id}")),
                system_event: None,
                subtask_of: None,
            },
            context: TraceContextInfo::default(),
            decision: TraceDecision {
                action: "exec".to_string(),
                classification: "ephemeral_compute".to_string(),
                ..TraceDecision::default()
            },
            outcome: TraceOutcome {
                success: true,
                duration,
                estimated_cost: cost,
                ..TraceOutcome::default()
            },
            reflection: None,
        }
    }

    async fn seeded() -> (TempDir, TraceQuery) {
        let dir = tempfile::tempdir().unwrap();
        let writer = TraceWriter::new(dir.path());
        writer.write("s1", Some("main"), &trace("alpha", 0, 0.5, 100));
        writer.write("s1", Some("main"), &trace("beta", 1, 0.1, 300));
        writer.write("s2", Some("main"), &trace("gamma", 2, 0.9, 200));
        writer.flush().await;
        let query = TraceQuery::new(dir.path());
        (dir, query)
    }

    #[tokio::test]
    async fn test_default_query_is_timestamp_descending() {
        let (_dir, query) = seeded().await;
        let traces = query.query(&TraceQueryParams::default()).await.unwrap();
        let ids: Vec<&str> = traces.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["gamma", "beta", "alpha"]);
    }

    #[tokio::test]
    async fn test_sort_by_cost_and_duration() {
        let (_dir, query) = seeded().await;

        let by_cost = query
            .query(&TraceQueryParams {
                sort_by: TraceSortKey::Cost,
                ascending: true,
                ..TraceQueryParams::default()
            })
            .await
            .unwrap();
        let ids: Vec<&str> = by_cost.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["beta", "alpha", "gamma"]);

        let by_duration = query
            .query(&TraceQueryParams {
                sort_by: TraceSortKey::Duration,
                ascending: false,
                ..TraceQueryParams::default()
            })
            .await
            .unwrap();
        let ids: Vec<&str> = by_duration.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["beta", "gamma", "alpha"]);
    }

    #[tokio::test]
    async fn test_keyword_filter_is_case_insensitive() {
        let (_dir, query) = seeded().await;
        let traces = query
            .query(&TraceQueryParams {
                keyword: Some("TASK ALPHA".to_string()),
                ..TraceQueryParams::default()
            })
            .await
            .unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].id, "alpha");
    }

    #[tokio::test]
    async fn test_time_range_filter_is_inclusive() {
        let (_dir, query) = seeded().await;
        let traces = query
            .query(&TraceQueryParams {
                since: Some(Utc.with_ymd_and_hms(2026, 7, 1, 12, 1, 0).unwrap()),
                until: Some(Utc.with_ymd_and_hms(2026, 7, 1, 12, 2, 0).unwrap()),
                ascending: true,
                ..TraceQueryParams::default()
            })
            .await
            .unwrap();
        let ids: Vec<&str> = traces.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_offset_and_limit_apply_after_sort() {
        let (_dir, query) = seeded().await;
        let traces = query
            .query(&TraceQueryParams {
                ascending: true,
                offset: 1,
                limit: 1,
                ..TraceQueryParams::default()
            })
            .await
            .unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].id, "beta");
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let (dir, query) = seeded().await;
        let path = dir.path().join("main").join("s1.jsonl");
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{this is not json\n\n");
        std::fs::write(&path, contents).unwrap();

        let traces = query.query(&TraceQueryParams::default()).await.unwrap();
        assert_eq!(traces.len(), 3);
    }

    #[tokio::test]
    async fn test_get_trace_by_id() {
        let (_dir, query) = seeded().await;
        let found = query.get_trace("beta").await.unwrap().unwrap();
        assert_eq!(found.id, "beta");
        assert!(query.get_trace("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_subtasks_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TraceWriter::new(dir.path());

        let mut parent = trace("parent", 0, 0.0, 0);
        parent.input.subtask_of = None;
        writer.write("s", Some("main"), &parent);
        for (i, id) in ["sub-b", "sub-a"].iter().enumerate() {
            let mut sub = trace(id, 5 - u32::try_from(i).unwrap(), 0.0, 0);
            sub.input.subtask_of = Some("parent".to_string());
            writer.write("s", Some("main"), &sub);
        }
        writer.flush().await;

        let query = TraceQuery::new(dir.path());
        let subtasks = query.get_subtasks("parent").await.unwrap();
        let ids: Vec<&str> = subtasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["sub-a", "sub-b"]);
    }

    #[tokio::test]
    async fn test_missing_base_dir_yields_empty() {
        let query = TraceQuery::new("/definitely/not/a/real/dir");
        assert!(query.query(&TraceQueryParams::default()).await.unwrap().is_empty());
    }
}
