//! Request routing to the inference worker.
//!
//! [`RequestRouter`] tags every request with a correlation id, registers a
//! oneshot slot for it, and lets a background reader task deliver the
//! worker's replies to the matching slot. Each request resolves exactly
//! once: from its reply or from its deadline, whichever comes first. A
//! reply for a request that already timed out finds no slot and is
//! dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use phishguard_core::pipeline::Predictor;
use phishguard_core::tier::ScoreClassifier;
use phishguard_types::config::RouterConfig;
use phishguard_types::protocol::{
    PredictResponse, RequestEnvelope, ResponseEnvelope, WorkerRequest,
};
use phishguard_types::verdict::Verdict;
use phishguard_types::{GuardError, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::worker::local::LocalWorkerLauncher;
use crate::worker::{WorkerCoordinator, WorkerLauncher};

/// Pending response registry: maps correlation ids to oneshot senders.
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<PredictResponse>>>>;

/// Lock the registry. A poisoned lock still holds a consistent map.
fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<PredictResponse>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes its request's slot when dropped, however `send` exits.
struct PendingSlot<'a> {
    id: u64,
    pending: &'a PendingMap,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.id);
    }
}

/// Which surface a request comes from; selects the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A user waiting on the popup.
    Interactive,
    /// A full-page scan before navigation proceeds.
    PageScan,
}

impl RequestKind {
    /// The configured deadline for this kind of request.
    pub fn deadline(self, config: &RouterConfig) -> Duration {
        match self {
            Self::Interactive => config.interactive_timeout(),
            Self::PageScan => config.page_scan_timeout(),
        }
    }
}

/// Sends requests to the inference worker and correlates the replies.
pub struct RequestRouter {
    coordinator: WorkerCoordinator,
    pending: PendingMap,
    next_id: AtomicU64,
    config: RouterConfig,
    reader: JoinHandle<()>,
}

impl RequestRouter {
    /// Create a router launching workers through `launcher`.
    ///
    /// Spawns the reply reader on the current Tokio runtime.
    pub async fn new(launcher: Arc<dyn WorkerLauncher>, config: RouterConfig) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_replies(replies_rx, Arc::clone(&pending)));

        Self {
            coordinator: WorkerCoordinator::new(launcher, replies_tx),
            pending,
            next_id: AtomicU64::new(1),
            config,
            reader,
        }
    }

    /// Router backed by an in-process worker running `predictor`.
    pub async fn local(predictor: Arc<Predictor>, config: RouterConfig) -> Self {
        Self::new(Arc::new(LocalWorkerLauncher::new(predictor)), config).await
    }

    /// Send `request` and wait up to `deadline` for its reply.
    ///
    /// Fails with [`GuardError::WorkerCreationFailed`] when no worker can
    /// be started, and with [`GuardError::Timeout`] when the deadline
    /// passes first. A timeout leaves the worker alone. Dropping the
    /// returned future releases the request's slot.
    pub async fn send(&self, request: WorkerRequest, deadline: Duration) -> Result<PredictResponse> {
        let worker = self.coordinator.ensure_ready().await?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = request.kind();
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);
        let _slot = PendingSlot {
            id,
            pending: &self.pending,
        };

        debug!(id, kind, "dispatching request");
        let started = Instant::now();
        worker.dispatch(RequestEnvelope { id, request }).await?;

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(response)) => {
                debug!(
                    id,
                    success = response.success,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request resolved"
                );
                Ok(response)
            }
            // Reader task exited and dropped the sender.
            Ok(Err(_)) => Err(GuardError::ChannelClosed),
            Err(_) => {
                let after_ms = deadline.as_millis() as u64;
                warn!(id, kind, after_ms, "request timed out");
                Err(GuardError::Timeout {
                    operation: format!("{kind} request {id}"),
                    after_ms,
                })
            }
        }
    }

    /// Classify a page and map the score to a verdict.
    pub async fn predict(&self, url: &str, content: &str, kind: RequestKind) -> Result<Verdict> {
        let response = self
            .send(WorkerRequest::predict(url, content), kind.deadline(&self.config))
            .await?;
        let score = response.into_score()?;
        Ok(ScoreClassifier::verdict(score))
    }

    /// Number of requests still waiting for a reply.
    pub async fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// The worker coordinator behind this router.
    pub fn coordinator(&self) -> &WorkerCoordinator {
        &self.coordinator
    }
}

impl Drop for RequestRouter {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_replies(mut replies: mpsc::UnboundedReceiver<ResponseEnvelope>, pending: PendingMap) {
    while let Some(ResponseEnvelope { id, response }) = replies.recv().await {
        let slot = lock(&pending).remove(&id);
        match slot {
            Some(tx) => {
                // The caller may have given up between removal and send.
                let _ = tx.send(response);
            }
            None => debug!(id, "discarding reply with no pending request"),
        }
    }

    debug!("reply channel closed");
    lock(&pending).clear();
}
