//! Router integration tests.
//!
//! Runs requests through the router, coordinator and an in-process worker
//! backed by the real scoring pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use phishguard_core::features::FeatureVector;
use phishguard_core::model::{Model, ModelLoader};
use phishguard_core::pipeline::Predictor;
use phishguard_core::scaler::ScalerSource;
use phishguard_services::router::{RequestKind, RequestRouter};
use phishguard_services::worker::WorkerState;
use phishguard_types::GuardError;
use phishguard_types::config::RouterConfig;
use phishguard_types::verdict::Tier;

/// P(legit) = 1 / (1 + url length / 20): long URLs look worse.
struct LengthModel;

impl Model for LengthModel {
    fn predict(&self, input: &FeatureVector) -> phishguard_types::Result<f64> {
        let len = input.get(0).unwrap_or(0.0);
        Ok(1.0 / (1.0 + len / 20.0))
    }

    fn name(&self) -> &str {
        "length"
    }
}

/// Counts loads and optionally stalls forever.
struct TestLoader {
    loads: AtomicUsize,
    stall: bool,
}

#[async_trait]
impl ModelLoader for TestLoader {
    async fn load(&self) -> phishguard_types::Result<Arc<dyn Model>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(Arc::new(LengthModel))
    }
}

fn loader(stall: bool) -> Arc<TestLoader> {
    Arc::new(TestLoader {
        loads: AtomicUsize::new(0),
        stall,
    })
}

async fn router_with(loader: Arc<TestLoader>, config: RouterConfig) -> RequestRouter {
    let predictor = Arc::new(Predictor::new(ScalerSource::none(), loader));
    RequestRouter::local(predictor, config).await
}

#[tokio::test]
async fn end_to_end_verdicts() {
    let router = router_with(loader(false), RouterConfig::default()).await;

    // 20 chars: P(legit) = 0.5, score 0.5.
    let v = router
        .predict("https://abcdefgh.com", "", RequestKind::Interactive)
        .await
        .unwrap();
    assert_eq!(v.percentage, 50);
    assert_eq!(v.tier, Tier::Warning);

    let long = format!("https://{}.tk/login", "a".repeat(80));
    let v = router
        .predict(&long, "", RequestKind::PageScan)
        .await
        .unwrap();
    assert_eq!(v.tier, Tier::Phishing);
}

#[tokio::test]
async fn burst_of_requests_shares_one_worker_and_one_model_load() {
    let loads = loader(false);
    let router = Arc::new(router_with(loads.clone(), RouterConfig::default()).await);

    let futs = (0..20).map(|i| {
        let router = Arc::clone(&router);
        async move {
            router
                .predict(&format!("https://site{i}.com"), "", RequestKind::Interactive)
                .await
        }
    });
    let results = join_all(futs).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(router.coordinator().launches(), 1);
    assert_eq!(loads.loads.load(Ordering::SeqCst), 1);
    assert_eq!(router.pending_count().await, 0);
}

#[tokio::test]
async fn stalled_model_times_out_without_killing_worker() {
    let config = RouterConfig {
        interactive_timeout_ms: 50,
        page_scan_timeout_ms: 80,
    };
    let router = router_with(loader(true), config).await;

    let err = router
        .predict("https://a.com", "", RequestKind::Interactive)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GuardError::Timeout {
            operation: "PREDICT request 1".into(),
            after_ms: 50,
        }
    );
    assert_eq!(router.pending_count().await, 0);
    assert_eq!(router.coordinator().state().await, WorkerState::Ready);
}

#[tokio::test]
async fn shutdown_worker_is_relaunched_on_next_request() {
    let loads = loader(false);
    let router = router_with(loads.clone(), RouterConfig::default()).await;

    router
        .predict("https://a.com", "", RequestKind::Interactive)
        .await
        .unwrap();
    router.coordinator().shutdown().await;

    router
        .predict("https://b.com", "", RequestKind::Interactive)
        .await
        .unwrap();
    assert_eq!(router.coordinator().launches(), 2);
    // The predictor, and so the model, survives the restart.
    assert_eq!(loads.loads.load(Ordering::SeqCst), 1);
}
