//! End-to-end scoring pipeline.
//!
//! [`Predictor`] wires extraction, normalization and classification
//! together. It is what the inference worker owns.

use std::sync::Arc;
use std::time::Instant;

use phishguard_types::Result;
use phishguard_types::config::GuardConfig;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::features::FeatureExtractor;
use crate::model::{FileModelLoader, ModelLoader};
use crate::scaler::{Normalizer, ScalerSource};

/// Turns `(url, content)` into P(phishing).
pub struct Predictor {
    extractor: FeatureExtractor,
    normalizer: Normalizer,
    scaler: ScalerSource,
    classifier: Classifier,
}

impl Predictor {
    /// Assemble a predictor from its parts.
    pub fn new(scaler: ScalerSource, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            normalizer: Normalizer::new(),
            scaler,
            classifier: Classifier::new(loader),
        }
    }

    /// Predictor reading both artifacts from the configured paths.
    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(
            ScalerSource::from_file(&config.artifacts.scaler_path),
            Arc::new(FileModelLoader::new(&config.artifacts.model_path)),
        )
    }

    /// Score a page.
    ///
    /// Only model failures surface; a bad URL or a missing scaler degrade
    /// the features instead.
    pub async fn predict(&self, url: &str, content: &str) -> Result<f64> {
        let started = Instant::now();
        let raw = self.extractor.extract(url, content);
        let params = self.scaler.params().await;
        let features = self.normalizer.apply(&raw, params.as_deref());
        let score = self.classifier.predict(&features).await?;
        debug!(
            url = %url,
            score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "page scored"
        );
        Ok(score)
    }

    /// Load the model and scaler ahead of the first request.
    ///
    /// Failures are logged and left for the next request to retry.
    pub async fn warm_up(&self) {
        let scaler_ready = self.scaler.params().await.is_some();
        match self.classifier.model().await {
            Ok(model) => info!(model = model.name(), scaler_ready, "predictor warmed up"),
            Err(e) => warn!(error = %e, scaler_ready, "warm-up could not load model"),
        }
    }

    /// Whether the model is loaded.
    pub async fn is_ready(&self) -> bool {
        self.classifier.is_loaded().await
    }
}
