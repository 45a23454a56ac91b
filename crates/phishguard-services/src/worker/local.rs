//! In-process inference worker.
//!
//! Runs the scoring pipeline on a Tokio task fed by an unbounded inbox.
//! Requests are answered one at a time, in arrival order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use phishguard_core::pipeline::Predictor;
use phishguard_types::protocol::{
    PredictResponse, RequestEnvelope, ResponseEnvelope, WorkerRequest,
};
use phishguard_types::{GuardError, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ReplySink, WorkerContext, WorkerLauncher};

/// A worker task owning a shared [`Predictor`].
pub struct LocalWorker {
    id: u64,
    inbox: mpsc::UnboundedSender<RequestEnvelope>,
    cancel: CancellationToken,
}

impl LocalWorker {
    /// Spawn a worker on the current Tokio runtime.
    ///
    /// The worker warms the predictor up before serving; requests sent in
    /// the meantime queue in its inbox.
    pub fn spawn(id: u64, predictor: Arc<Predictor>, replies: ReplySink) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| GuardError::WorkerCreationFailed(e.to_string()))?;
        let (inbox, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        handle.spawn(run(id, predictor, rx, replies, cancel.clone()));
        info!(worker = id, "inference worker launched");
        Ok(Self { id, inbox, cancel })
    }

    /// Worker identifier, unique per launcher.
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl WorkerContext for LocalWorker {
    fn is_alive(&self) -> bool {
        !self.cancel.is_cancelled() && !self.inbox.is_closed()
    }

    async fn dispatch(&self, envelope: RequestEnvelope) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(GuardError::ChannelClosed);
        }
        self.inbox.send(envelope).map_err(|_| GuardError::ChannelClosed)
    }

    fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for LocalWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    id: u64,
    predictor: Arc<Predictor>,
    mut inbox: mpsc::UnboundedReceiver<RequestEnvelope>,
    replies: ReplySink,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => {
            info!(worker = id, "inference worker cancelled during warm-up");
            return;
        }
        _ = predictor.warm_up() => {}
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(worker = id, "inference worker shutting down");
                break;
            }
            msg = inbox.recv() => {
                let Some(RequestEnvelope { id: request_id, request }) = msg else {
                    debug!(worker = id, "inbox closed");
                    break;
                };
                let response = handle(&predictor, request).await;
                let envelope = ResponseEnvelope { id: request_id, response };
                if replies.send(envelope).is_err() {
                    debug!(worker = id, "reply channel closed");
                    break;
                }
            }
        }
    }
}

async fn handle(predictor: &Predictor, request: WorkerRequest) -> PredictResponse {
    match request {
        WorkerRequest::Predict { url, content } => {
            PredictResponse::from(predictor.predict(&url, &content).await)
        }
    }
}

/// Launches [`LocalWorker`]s sharing one [`Predictor`].
///
/// Sharing the predictor keeps the model and scaler loaded across worker
/// restarts.
pub struct LocalWorkerLauncher {
    predictor: Arc<Predictor>,
    next_id: AtomicU64,
}

impl LocalWorkerLauncher {
    /// Create a launcher for `predictor`.
    pub fn new(predictor: Arc<Predictor>) -> Self {
        Self {
            predictor,
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl WorkerLauncher for LocalWorkerLauncher {
    async fn launch(&self, replies: ReplySink) -> Result<Arc<dyn WorkerContext>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let worker = LocalWorker::spawn(id, Arc::clone(&self.predictor), replies)?;
        Ok(Arc::new(worker))
    }
}
