//! Request correlation over the extension channel.
//!
//! Every request sent to the extension is registered under a unique request
//! id and completes when a reply carrying that id arrives, when its timeout
//! elapses, or when the channel is lost. Entries are kept in insertion order
//! so replies without an id can be matched to the oldest outstanding request
//! of the same kind.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use relay_protocols::RelayError;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Reply type a pending request waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    Screenshot,
    AuthToken,
}

type ReplySender = oneshot::Sender<Result<Value, RelayError>>;

struct PendingRequest {
    request_id: String,
    kind: ReplyKind,
    tx: ReplySender,
    created_at: Instant,
}

#[derive(Default)]
struct PendingTable {
    /// Insertion sequence -> request. Ascending iteration is oldest first.
    order: BTreeMap<u64, PendingRequest>,
    by_id: HashMap<String, u64>,
    next_seq: u64,
}

impl PendingTable {
    fn remove_id(&mut self, request_id: &str) -> Option<PendingRequest> {
        let seq = self.by_id.remove(request_id)?;
        self.order.remove(&seq)
    }

    fn remove_oldest(&mut self, kind: ReplyKind) -> Option<PendingRequest> {
        let seq = self
            .order
            .iter()
            .find(|(_, pending)| pending.kind == kind)
            .map(|(seq, _)| *seq)?;
        let pending = self.order.remove(&seq)?;
        self.by_id.remove(&pending.request_id);
        Some(pending)
    }
}

/// Handle for a registered request; consumed by [`Correlator::wait`].
#[derive(Debug)]
pub struct PendingReply {
    request_id: String,
    rx: oneshot::Receiver<Result<Value, RelayError>>,
}

impl PendingReply {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// How an inbound reply was matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The reply's id matched a pending request.
    Matched(String),
    /// The reply had no id and completed the oldest request of its kind.
    Fallback(String),
    /// The reply's id is not pending (already timed out or never sent).
    Unknown(String),
    /// The reply had no id and nothing of its kind was pending.
    Orphaned,
}

/// Pending-request table shared by every relay endpoint.
pub struct Correlator {
    table: Mutex<PendingTable>,
    max_pending: usize,
    id_counter: AtomicU64,
}

impl Correlator {
    pub fn new(max_pending: usize) -> Self {
        Self {
            table: Mutex::new(PendingTable::default()),
            max_pending,
            id_counter: AtomicU64::new(0),
        }
    }

    /// Fresh request id: wall-clock millis plus a process-wide counter.
    pub fn next_request_id(&self) -> String {
        let n = self.id_counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", chrono::Utc::now().timestamp_millis(), n)
    }

    /// Register a request that expects a reply of `kind`.
    pub fn register(
        &self,
        request_id: impl Into<String>,
        kind: ReplyKind,
    ) -> Result<PendingReply, RelayError> {
        let request_id = request_id.into();
        let mut table = self.table.lock();

        if table.by_id.contains_key(&request_id) {
            return Err(RelayError::DuplicateRequestId(request_id));
        }
        if table.order.len() >= self.max_pending {
            return Err(RelayError::TooManyPending(self.max_pending));
        }

        let (tx, rx) = oneshot::channel();
        let seq = table.next_seq;
        table.next_seq += 1;
        table.by_id.insert(request_id.clone(), seq);
        table.order.insert(
            seq,
            PendingRequest {
                request_id: request_id.clone(),
                kind,
                tx,
                created_at: Instant::now(),
            },
        );
        debug!("Registered pending {:?} request {}", kind, request_id);

        Ok(PendingReply { request_id, rx })
    }

    /// Await the reply for `reply`, removing the entry if `timeout` elapses first.
    pub async fn wait<F>(
        &self,
        reply: PendingReply,
        timeout: Duration,
        on_timeout: F,
    ) -> Result<Value, RelayError>
    where
        F: FnOnce() -> RelayError,
    {
        let PendingReply { request_id, rx } = reply;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RelayError::Transport(format!(
                "reply channel for request {} closed",
                request_id
            ))),
            Err(_) => {
                self.cancel(&request_id);
                warn!("Request {} timed out after {:?}", request_id, timeout);
                Err(on_timeout())
            }
        }
    }

    /// Complete a pending request from an inbound reply.
    ///
    /// A reply with an id completes exactly that request. A reply without an
    /// id completes the oldest pending request expecting the same kind.
    pub fn resolve(
        &self,
        request_id: Option<&str>,
        kind: ReplyKind,
        outcome: Result<Value, RelayError>,
    ) -> Resolution {
        let (pending, resolution) = {
            let mut table = self.table.lock();
            match request_id {
                Some(id) => match table.remove_id(id) {
                    Some(pending) => (pending, Resolution::Matched(id.to_string())),
                    None => return Resolution::Unknown(id.to_string()),
                },
                None => match table.remove_oldest(kind) {
                    Some(pending) => {
                        let id = pending.request_id.clone();
                        (pending, Resolution::Fallback(id))
                    }
                    None => return Resolution::Orphaned,
                },
            }
        };

        if pending.kind != kind {
            warn!(
                "Request {} expected a {:?} reply but received {:?}",
                pending.request_id, pending.kind, kind
            );
        }
        debug!(
            "Completing request {} after {:?}",
            pending.request_id,
            pending.created_at.elapsed()
        );
        // The waiter may already have given up; nothing to do then.
        let _ = pending.tx.send(outcome);
        resolution
    }

    /// Drop a pending request without completing it.
    pub fn cancel(&self, request_id: &str) -> bool {
        self.table.lock().remove_id(request_id).is_some()
    }

    /// Fail every pending request with `error`. Returns how many were failed.
    pub fn reject_all(&self, error: RelayError) -> usize {
        let drained = {
            let mut table = self.table.lock();
            table.by_id.clear();
            std::mem::take(&mut table.order)
        };
        let count = drained.len();
        for (_, pending) in drained {
            let _ = pending.tx.send(Err(error.clone()));
        }
        if count > 0 {
            warn!("Rejected {} pending request(s): {}", count, error);
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.table.lock().order.len()
    }
}

#[cfg(test)]
#[path = "correlator_tests.rs"]
mod tests;
