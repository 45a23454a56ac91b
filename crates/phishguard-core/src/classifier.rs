//! Model-backed phishing classifier.
//!
//! Owns the model lifecycle: the model is loaded on first demand through a
//! [`SingleFlight`] so concurrent first requests share one load, and a
//! failed load is retried by the next request.

use std::sync::Arc;

use phishguard_types::{GuardError, Result};
use tracing::{debug, warn};

use crate::features::FeatureVector;
use crate::flight::{FlightState, SingleFlight};
use crate::model::{Model, ModelLoader};

/// Maps standardized feature vectors to a phishing score.
pub struct Classifier {
    loader: Arc<dyn ModelLoader>,
    model: SingleFlight<Arc<dyn Model>, GuardError>,
}

impl Classifier {
    /// Create a classifier that loads its model through `loader`.
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            model: SingleFlight::new(),
        }
    }

    /// The loaded model, loading it if needed.
    pub async fn model(&self) -> Result<Arc<dyn Model>> {
        let loader = Arc::clone(&self.loader);
        self.model
            .get_or_init(|| async move {
                loader.load().await.map_err(|e| match e {
                    GuardError::ModelUnavailable(_) => e,
                    other => GuardError::ModelUnavailable(other.to_string()),
                })
            })
            .await
            .inspect_err(|e| warn!(error = %e, "model load failed"))
    }

    /// P(phishing) for a standardized feature vector.
    ///
    /// The model outputs P(legitimate); the score is its complement,
    /// clamped to `[0, 1]`.
    pub async fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let model = self.model().await?;
        let legit = model.predict(features)?;
        let score = (1.0 - legit).clamp(0.0, 1.0);
        debug!(model = model.name(), legit, score, "model evaluated");
        Ok(score)
    }

    /// Whether the model is currently loaded.
    pub async fn is_loaded(&self) -> bool {
        self.model.state().await == FlightState::Ready
    }

    /// Number of load attempts started so far.
    pub fn load_attempts(&self) -> usize {
        self.model.attempts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::future::join_all;

    struct Constant(f64);

    impl Model for Constant {
        fn predict(&self, _input: &FeatureVector) -> Result<f64> {
            Ok(self.0)
        }
    }

    /// Fails the first `failures` loads, then yields `Constant(legit)`.
    struct CountingLoader {
        loads: AtomicUsize,
        failures: usize,
        legit: f64,
    }

    impl CountingLoader {
        fn new(failures: usize, legit: f64) -> Arc<Self> {
            Arc::new(Self {
                loads: AtomicUsize::new(0),
                failures,
                legit,
            })
        }
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn Model>> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if n < self.failures {
                return Err(GuardError::ModelUnavailable("artifact missing".into()));
            }
            Ok(Arc::new(Constant(self.legit)))
        }
    }

    #[tokio::test]
    async fn score_is_complement_of_model_output() {
        let classifier = Classifier::new(CountingLoader::new(0, 0.8));
        let score = classifier.predict(&FeatureVector::zeros()).await.unwrap();
        assert!((score - 0.2).abs() < 1e-12);
    }

    #[tokio::test]
    async fn score_is_clamped() {
        let classifier = Classifier::new(CountingLoader::new(0, 1.7));
        assert_eq!(classifier.predict(&FeatureVector::zeros()).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn concurrent_first_requests_share_one_load() {
        let loader = CountingLoader::new(0, 0.5);
        let classifier = Arc::new(Classifier::new(loader.clone()));

        let futs = (0..10).map(|_| {
            let c = Arc::clone(&classifier);
            async move { c.predict(&FeatureVector::zeros()).await }
        });
        let results = join_all(futs).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(classifier.is_loaded().await);
    }

    #[tokio::test]
    async fn failed_load_fails_request_then_retries() {
        let loader = CountingLoader::new(1, 0.9);
        let classifier = Classifier::new(loader.clone());

        let err = classifier.predict(&FeatureVector::zeros()).await.unwrap_err();
        assert!(matches!(err, GuardError::ModelUnavailable(_)));
        assert!(!classifier.is_loaded().await);

        let score = classifier.predict(&FeatureVector::zeros()).await.unwrap();
        assert!((score - 0.1).abs() < 1e-12);
        assert_eq!(classifier.load_attempts(), 2);
    }

    #[tokio::test]
    async fn foreign_load_errors_become_model_unavailable() {
        struct Broken;

        #[async_trait]
        impl ModelLoader for Broken {
            async fn load(&self) -> Result<Arc<dyn Model>> {
                Err(GuardError::Config("bad path".into()))
            }
        }

        let err = Classifier::new(Arc::new(Broken)).model().await.err().unwrap();
        assert!(matches!(err, GuardError::ModelUnavailable(_)));
    }
}
