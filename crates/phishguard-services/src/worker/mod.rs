//! Inference worker lifecycle.
//!
//! A worker is an isolated context that owns the scoring pipeline and
//! answers [`RequestEnvelope`]s over a reply channel. Creating one is
//! expensive, so [`WorkerCoordinator`] keeps at most one alive and makes
//! concurrent callers share a single creation attempt.

pub mod local;

use std::sync::Arc;

use async_trait::async_trait;
use phishguard_core::flight::{FlightState, SingleFlight};
use phishguard_types::protocol::{RequestEnvelope, ResponseEnvelope};
use phishguard_types::{GuardError, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where a worker sends its replies.
pub type ReplySink = mpsc::UnboundedSender<ResponseEnvelope>;

/// A running inference worker.
#[async_trait]
pub trait WorkerContext: Send + Sync {
    /// Whether the worker can still accept requests.
    fn is_alive(&self) -> bool;

    /// Hand a request to the worker. The reply, if any, arrives on the
    /// [`ReplySink`] the worker was launched with.
    async fn dispatch(&self, envelope: RequestEnvelope) -> Result<()>;

    /// Stop the worker. After this, [`is_alive`](Self::is_alive) is false.
    fn shutdown(&self) {}
}

/// Creates workers.
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// Start a new worker replying on `replies`.
    async fn launch(&self, replies: ReplySink) -> Result<Arc<dyn WorkerContext>>;
}

/// Coordinator lifecycle as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No worker and no creation in progress.
    Uninitialized,
    /// A creation attempt is in flight.
    Creating,
    /// A worker exists; it may since have died.
    Ready,
}

/// Owns the single inference worker.
pub struct WorkerCoordinator {
    launcher: Arc<dyn WorkerLauncher>,
    replies: ReplySink,
    worker: SingleFlight<Arc<dyn WorkerContext>, GuardError>,
}

impl WorkerCoordinator {
    /// Create a coordinator. No worker is launched until
    /// [`ensure_ready`](Self::ensure_ready) is called.
    pub fn new(launcher: Arc<dyn WorkerLauncher>, replies: ReplySink) -> Self {
        Self {
            launcher,
            replies,
            worker: SingleFlight::new(),
        }
    }

    /// Return a live worker, creating one if needed.
    ///
    /// Callers arriving during creation join it and all observe the same
    /// result. A failed creation is not remembered.
    pub async fn ensure_ready(&self) -> Result<Arc<dyn WorkerContext>> {
        if self.worker.invalidate_if(|w| !w.is_alive()).await {
            info!("inference worker is gone, recreating");
        }

        let launcher = Arc::clone(&self.launcher);
        let replies = self.replies.clone();
        self.worker
            .get_or_init(|| async move {
                debug!("launching inference worker");
                launcher.launch(replies).await.map_err(|e| match e {
                    GuardError::WorkerCreationFailed(_) => e,
                    other => GuardError::WorkerCreationFailed(other.to_string()),
                })
            })
            .await
            .inspect_err(|e| warn!(error = %e, "inference worker creation failed"))
    }

    /// Shut down the current worker, if any. The next
    /// [`ensure_ready`](Self::ensure_ready) launches a new one.
    pub async fn shutdown(&self) {
        if let Some(worker) = self.worker.get().await {
            worker.shutdown();
            self.worker.invalidate_if(|w| Arc::ptr_eq(w, &worker)).await;
            info!("inference worker shut down");
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> WorkerState {
        match self.worker.state().await {
            FlightState::Empty => WorkerState::Uninitialized,
            FlightState::Pending => WorkerState::Creating,
            FlightState::Ready => WorkerState::Ready,
        }
    }

    /// Number of creation attempts started so far.
    pub fn launches(&self) -> usize {
        self.worker.attempts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use futures_util::future::join_all;

    struct FakeWorker {
        alive: AtomicBool,
    }

    #[async_trait]
    impl WorkerContext for FakeWorker {
        fn is_alive(&self) -> bool {
            self.alive.load(Ordering::SeqCst)
        }

        async fn dispatch(&self, _envelope: RequestEnvelope) -> Result<()> {
            Ok(())
        }

        fn shutdown(&self) {
            self.alive.store(false, Ordering::SeqCst);
        }
    }

    /// Fails the first `failures` launches.
    struct FakeLauncher {
        launches: AtomicUsize,
        failures: usize,
    }

    impl FakeLauncher {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                launches: AtomicUsize::new(0),
                failures,
            })
        }
    }

    #[async_trait]
    impl WorkerLauncher for FakeLauncher {
        async fn launch(&self, _replies: ReplySink) -> Result<Arc<dyn WorkerContext>> {
            let n = self.launches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if n < self.failures {
                return Err(GuardError::Config("sandbox refused".into()));
            }
            Ok(Arc::new(FakeWorker {
                alive: AtomicBool::new(true),
            }))
        }
    }

    fn coordinator(launcher: Arc<FakeLauncher>) -> Arc<WorkerCoordinator> {
        let (tx, _rx) = mpsc::unbounded_channel();
        Arc::new(WorkerCoordinator::new(launcher, tx))
    }

    #[tokio::test]
    async fn concurrent_callers_trigger_one_creation() {
        let launcher = FakeLauncher::new(0);
        let coord = coordinator(launcher.clone());

        let futs = (0..12).map(|_| {
            let c = Arc::clone(&coord);
            async move { c.ensure_ready().await }
        });
        let workers: Vec<_> = join_all(futs)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert!(workers.iter().all(|w| Arc::ptr_eq(w, &workers[0])));
        assert_eq!(coord.state().await, WorkerState::Ready);
    }

    #[tokio::test]
    async fn creation_failure_reaches_every_joined_caller() {
        let launcher = FakeLauncher::new(1);
        let coord = coordinator(launcher.clone());

        let futs = (0..5).map(|_| {
            let c = Arc::clone(&coord);
            async move { c.ensure_ready().await }
        });
        let results = join_all(futs).await;

        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        for r in &results {
            let err = r.as_ref().err().unwrap();
            assert!(matches!(err, GuardError::WorkerCreationFailed(msg) if msg.contains("sandbox refused")));
        }
        assert_eq!(coord.state().await, WorkerState::Uninitialized);

        assert!(coord.ensure_ready().await.is_ok());
        assert_eq!(coord.launches(), 2);
    }

    #[tokio::test]
    async fn dead_worker_is_replaced() {
        let launcher = FakeLauncher::new(0);
        let coord = coordinator(launcher.clone());

        let first = coord.ensure_ready().await.unwrap();
        let again = coord.ensure_ready().await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        first.shutdown();
        let second = coord.ensure_ready().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn shutdown_stops_and_forgets_worker() {
        let coord = coordinator(FakeLauncher::new(0));
        let worker = coord.ensure_ready().await.unwrap();

        coord.shutdown().await;
        assert!(!worker.is_alive());
        assert_eq!(coord.state().await, WorkerState::Uninitialized);

        // Nothing to do the second time.
        coord.shutdown().await;
        assert_eq!(coord.launches(), 1);
    }

    #[tokio::test]
    async fn starts_uninitialized() {
        let coord = coordinator(FakeLauncher::new(0));
        assert_eq!(coord.state().await, WorkerState::Uninitialized);
        assert_eq!(coord.launches(), 0);
    }
}
