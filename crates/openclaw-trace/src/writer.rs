//! Append-only JSONL trace writer.
//!
//! All writes funnel through one worker task with a single in-order queue,
//! so two `write()` calls for the same session land as two appended lines
//! in call order. Directory creation is memoised. Every I/O error is
//! swallowed after a debug log: trace failure must never block agent
//! execution.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

use crate::trace::ReasoningTrace;

/// Agent directory used when no agent id is given.
const DEFAULT_AGENT_DIR: &str = "default";

enum WriterMessage {
    Append { path: PathBuf, line: String },
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget writer for reasoning traces.
///
/// One file per `(agent, session)` at
/// `<baseDir>/<agentId or "default">/<sessionId>.jsonl`.
#[derive(Debug, Clone)]
pub struct TraceWriter {
    base_dir: PathBuf,
    tx: mpsc::UnboundedSender<WriterMessage>,
}

impl TraceWriter {
    /// Create a writer and spawn its worker task.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx));
        Self {
            base_dir: base_dir.into(),
            tx,
        }
    }

    /// The base directory trace files live under.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the trace file for a `(agent, session)` pair.
    #[must_use]
    pub fn file_path(&self, session_id: &str, agent_id: Option<&str>) -> PathBuf {
        self.base_dir
            .join(agent_id.unwrap_or(DEFAULT_AGENT_DIR))
            .join(format!("{session_id}.jsonl"))
    }

    /// Enqueue one trace for appending. Never blocks, never fails the
    /// caller; serialisation or queue errors are logged and dropped.
    pub fn write(&self, session_id: &str, agent_id: Option<&str>, trace: &ReasoningTrace) {
        let line = match serde_json::to_string(trace) {
            Ok(line) => line,
            Err(err) => {
                tracing::debug!(error = %err, "failed to serialise trace; dropping");
                return;
            },
        };
        let message = WriterMessage::Append {
            path: self.file_path(session_id, agent_id),
            line,
        };
        let ok = self.tx.send(message).is_ok();
        eprintln!("DEBUG write() enqueue ok={ok} path={:?}", self.file_path(session_id, agent_id));
        if !ok {
            tracing::debug!("trace writer worker is gone; dropping trace");
        }
    }

    /// Wait until everything enqueued so far has been written.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriterMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<WriterMessage>) {
    let mut created_dirs: HashSet<PathBuf> = HashSet::new();

    while let Some(message) = rx.recv().await {
        match message {
            WriterMessage::Append { path, line } => {
                eprintln!("DEBUG append start {:?}", path);
                append_line(&mut created_dirs, &path, &line).await;
                eprintln!("DEBUG append done {:?}", path);
            },
            WriterMessage::Flush(ack) => {
                eprintln!("DEBUG flush");
                let _ = ack.send(());
            },
        }
    }
}

async fn append_line(created_dirs: &mut HashSet<PathBuf>, path: &Path, line: &str) {
    if let Some(parent) = path.parent()
        && !created_dirs.contains(parent)
    {
        match tokio::fs::create_dir_all(parent).await {
            Ok(()) => {
                created_dirs.insert(parent.to_path_buf());
            },
            Err(err) => {
                eprintln!("DEBUG dir creation failed: {err}");
                tracing::debug!(error = %err, dir = %parent.display(), "trace dir creation failed");
                return;
            },
        }
    }

    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await;
    let mut file = match file {
        Ok(file) => file,
        Err(err) => {
            eprintln!("DEBUG open failed: {err}");
            tracing::debug!(error = %err, path = %path.display(), "trace file open failed");
            return;
        },
    };

    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    if let Err(err) = file.write_all(&buf).await {
        eprintln!("DEBUG write failed: {err}");
        tracing::debug!(error = %err, path = %path.display(), "trace append failed");
    } else {
        eprintln!("DEBUG write ok {} bytes to {:?}", buf.len(), path);
    }
}
