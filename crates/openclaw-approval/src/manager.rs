//! Approval manager — coordinates suspended tool calls and human decisions.
//!
//! The manager exclusively owns pending [`ApprovalRecord`]s and their expiry
//! timers. A registered record completes its future in exactly one of two
//! ways: a human decision via [`ApprovalManager::resolve`], or the timeout
//! sentinel `None` when the timer fires. Resolved and expired records are
//! retained for a 15-second grace period so late
//! [`ApprovalManager::await_decision`] callers still observe the outcome,
//! then evicted.
//!
//! Forwarders (chat layers) subscribe to [`ApprovalEvent`]s instead of
//! holding references into the manager.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use openclaw_core::types::{ApprovalId, now_ms};

use crate::error::{ApprovalError, ApprovalResult};
use crate::request::{ApprovalDecision, ApprovalRecord, ApprovalRequest};

/// How long resolved records linger before eviction.
pub const RESOLVED_RETENTION: Duration = Duration::from_secs(15);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle events emitted for chat-layer forwarders.
#[derive(Debug, Clone)]
pub enum ApprovalEvent {
    /// A record was registered and is awaiting a decision.
    Requested {
        /// The pending record.
        record: Box<ApprovalRecord>,
    },
    /// A human resolved a pending record.
    Resolved {
        /// The record's id.
        id: ApprovalId,
        /// The decision taken.
        decision: ApprovalDecision,
        /// Who resolved it, if known.
        resolved_by: Option<String>,
    },
    /// A pending record's timer expired without a decision.
    Expired {
        /// The record's id.
        id: ApprovalId,
    },
}

/// Per-record resolution state carried on the watch channel.
#[derive(Debug, Clone)]
enum Signal {
    Pending,
    /// `None` is the timeout sentinel.
    Done(Option<ApprovalDecision>),
}

struct Entry {
    record: ApprovalRecord,
    tx: watch::Sender<Signal>,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    entries: Mutex<HashMap<ApprovalId, Entry>>,
    events: broadcast::Sender<ApprovalEvent>,
}

/// A handle that completes when the record is resolved or times out.
///
/// `None` means the approval timed out. Multiple handles may exist for the
/// same record; all observe the same outcome.
#[derive(Debug)]
pub struct DecisionFuture {
    rx: watch::Receiver<Signal>,
}

impl DecisionFuture {
    /// Wait for the decision (or `None` on timeout).
    pub async fn wait(mut self) -> Option<ApprovalDecision> {
        loop {
            {
                let signal = self.rx.borrow_and_update();
                if let Signal::Done(decision) = &*signal {
                    return *decision;
                }
            }
            if self.rx.changed().await.is_err() {
                // Manager dropped while pending; behave like a timeout.
                return None;
            }
        }
    }
}

/// Single-process coordinator for suspended tool calls.
pub struct ApprovalManager {
    inner: Arc<Inner>,
}

impl ApprovalManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    /// Subscribe to approval lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ApprovalEvent> {
        self.inner.events.subscribe()
    }

    /// Build a record for a request without arming any timer.
    ///
    /// A supplied id is trimmed; an invalid or absent id yields a fresh one.
    #[must_use]
    pub fn create(
        &self,
        request: ApprovalRequest,
        timeout_ms: u64,
        id: Option<&str>,
    ) -> ApprovalRecord {
        ApprovalRecord::new(request, timeout_ms, id)
    }

    /// Register a record and arm its expiry timer.
    ///
    /// Idempotent: registering an id that is already pending returns a new
    /// future for the same outcome.
    ///
    /// # Errors
    ///
    /// Fails with [`ApprovalError::AlreadyResolved`] when the record was
    /// already resolved or timed out.
    pub fn register(
        &self,
        record: ApprovalRecord,
        timeout_ms: u64,
    ) -> ApprovalResult<DecisionFuture> {
        let mut entries = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(existing) = entries.get(&record.id) {
            if matches!(*existing.tx.borrow(), Signal::Pending) {
                return Ok(DecisionFuture {
                    rx: existing.tx.subscribe(),
                });
            }
            return Err(ApprovalError::AlreadyResolved {
                id: record.id.clone(),
            });
        }

        let (tx, rx) = watch::channel(Signal::Pending);
        let id = record.id.clone();

        let timer = {
            let inner = Arc::clone(&self.inner);
            let id = id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
                Self::expire(&inner, &id);
            })
        };

        let _ = self.inner.events.send(ApprovalEvent::Requested {
            record: Box::new(record.clone()),
        });
        tracing::debug!(id = %id, tool = %record.request.tool_name, timeout_ms, "approval pending");

        entries.insert(
            id,
            Entry {
                record,
                tx,
                timer: Some(timer),
            },
        );

        Ok(DecisionFuture { rx })
    }

    /// Resolve a pending record with a human decision.
    ///
    /// Returns `false` when the id is unknown, already resolved, or already
    /// timed out; the pending→resolved transition is one-way.
    pub fn resolve(
        &self,
        id: &ApprovalId,
        decision: ApprovalDecision,
        resolved_by: Option<&str>,
    ) -> bool {
        let mut entries = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let Some(entry) = entries.get_mut(id) else {
            return false;
        };
        if !matches!(*entry.tx.borrow(), Signal::Pending) {
            return false;
        }

        if let Some(timer) = entry.timer.take() {
            timer.abort();
        }
        entry.record.resolved_at_ms = Some(now_ms());
        entry.record.decision = Some(decision);
        entry.record.resolved_by = resolved_by.map(ToString::to_string);
        let _ = entry.tx.send(Signal::Done(Some(decision)));

        let _ = self.inner.events.send(ApprovalEvent::Resolved {
            id: id.clone(),
            decision,
            resolved_by: resolved_by.map(ToString::to_string),
        });
        tracing::debug!(id = %id, decision = %decision, "approval resolved");

        Self::schedule_eviction(&self.inner, id.clone());
        true
    }

    /// Snapshot a record (pending, or resolved within the grace period).
    #[must_use]
    pub fn get_snapshot(&self, id: &ApprovalId) -> Option<ApprovalRecord> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .map(|entry| entry.record.clone())
    }

    /// A future for an existing record's outcome.
    ///
    /// Within the grace period after resolution the returned future is
    /// already complete. Returns `None` for unknown (or evicted) ids.
    #[must_use]
    pub fn await_decision(&self, id: &ApprovalId) -> Option<DecisionFuture> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .map(|entry| DecisionFuture {
                rx: entry.tx.subscribe(),
            })
    }

    /// Records still awaiting a decision. Excludes grace-retained entries.
    #[must_use]
    pub fn list_pending(&self) -> Vec<ApprovalRecord> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .filter(|entry| matches!(*entry.tx.borrow(), Signal::Pending))
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Number of records still awaiting a decision.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .filter(|entry| matches!(*entry.tx.borrow(), Signal::Pending))
            .count()
    }

    /// Timer body: complete the future with the timeout sentinel.
    fn expire(inner: &Arc<Inner>, id: &ApprovalId) {
        let mut entries = inner
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(entry) = entries.get_mut(id) else {
            return;
        };
        if !matches!(*entry.tx.borrow(), Signal::Pending) {
            return;
        }

        entry.timer = None;
        let _ = entry.tx.send(Signal::Done(None));
        let _ = inner.events.send(ApprovalEvent::Expired { id: id.clone() });
        tracing::debug!(id = %id, "approval timed out");

        Self::schedule_eviction(inner, id.clone());
    }

    fn schedule_eviction(inner: &Arc<Inner>, id: ApprovalId) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::time::sleep(RESOLVED_RETENTION).await;
            inner
                .entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(&id);
        });
    }
}

impl Default for ApprovalManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApprovalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalManager")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}
