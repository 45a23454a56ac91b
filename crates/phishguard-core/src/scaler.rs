//! Standard-score normalization.
//!
//! Replays the per-feature `(x - mean) / std` transform fitted at training
//! time. Missing parameters are not an error: the pipeline degrades to raw
//! features and says so once.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use phishguard_types::{GuardError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::features::{FEATURE_COUNT, FeatureVector};
use crate::flight::SingleFlight;

/// Fitted per-feature mean and standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParameters {
    /// Mean of each feature, by index.
    pub mean: Vec<f64>,
    /// Standard deviation of each feature, by index.
    pub std: Vec<f64>,
}

impl ScalerParameters {
    /// Parameters that leave every feature unchanged.
    pub fn identity() -> Self {
        Self {
            mean: vec![0.0; FEATURE_COUNT],
            std: vec![1.0; FEATURE_COUNT],
        }
    }

    /// Parse the JSON artifact `{"mean": [...], "std": [...]}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| GuardError::ScalerUnavailable(e.to_string()))?;
        if params.mean.len() != FEATURE_COUNT || params.std.len() != FEATURE_COUNT {
            warn!(
                mean_len = params.mean.len(),
                std_len = params.std.len(),
                expected = FEATURE_COUNT,
                "scaler parameters have unexpected length; missing entries pass through"
            );
        }
        Ok(params)
    }

    /// Mean at `index`; 0 when missing or not finite.
    fn mean_at(&self, index: usize) -> f64 {
        self.mean
            .get(index)
            .copied()
            .filter(|m| m.is_finite())
            .unwrap_or(0.0)
    }

    /// Std at `index`; 1 when missing, zero, or not finite.
    fn std_at(&self, index: usize) -> f64 {
        self.std
            .get(index)
            .copied()
            .filter(|s| s.is_finite() && *s != 0.0)
            .unwrap_or(1.0)
    }
}

/// Applies [`ScalerParameters`] to feature vectors.
pub struct Normalizer {
    warned: AtomicBool,
}

impl Normalizer {
    /// Create a new normalizer.
    pub fn new() -> Self {
        Self {
            warned: AtomicBool::new(false),
        }
    }

    /// Standardize `features`. With no parameters the input is returned
    /// unchanged.
    pub fn apply(&self, features: &FeatureVector, params: Option<&ScalerParameters>) -> FeatureVector {
        let Some(params) = params else {
            if !self.warned.swap(true, Ordering::Relaxed) {
                warn!("no scaler parameters, classifying raw features");
            }
            return *features;
        };
        features.map_indexed(|i, x| (x - params.mean_at(i)) / params.std_at(i))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

enum Origin {
    File(PathBuf),
    Fixed(Option<Arc<ScalerParameters>>),
}

/// Where scaler parameters come from, loaded lazily on first use.
///
/// A file that cannot be read is retried on the next request; once loaded,
/// parameters are kept for the lifetime of the source.
pub struct ScalerSource {
    origin: Origin,
    loaded: SingleFlight<Arc<ScalerParameters>, GuardError>,
    warned: AtomicBool,
}

impl ScalerSource {
    /// Load from a JSON artifact on disk.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::File(path.into()),
            loaded: SingleFlight::new(),
            warned: AtomicBool::new(false),
        }
    }

    /// Use in-memory parameters.
    pub fn fixed(params: ScalerParameters) -> Self {
        Self {
            origin: Origin::Fixed(Some(Arc::new(params))),
            loaded: SingleFlight::new(),
            warned: AtomicBool::new(false),
        }
    }

    /// Never provide parameters.
    pub fn none() -> Self {
        Self {
            origin: Origin::Fixed(None),
            loaded: SingleFlight::new(),
            warned: AtomicBool::new(false),
        }
    }

    /// The parameters, or `None` when they are unavailable.
    pub async fn params(&self) -> Option<Arc<ScalerParameters>> {
        match &self.origin {
            Origin::Fixed(params) => params.clone(),
            Origin::File(path) => {
                let path = path.clone();
                match self.loaded.get_or_init(|| load_file(path)).await {
                    Ok(params) => Some(params),
                    Err(e) => {
                        if self.warned.swap(true, Ordering::Relaxed) {
                            debug!(error = %e, "scaler parameters still unavailable");
                        } else {
                            warn!(error = %e, "scaler parameters unavailable");
                        }
                        None
                    }
                }
            }
        }
    }
}

async fn load_file(path: PathBuf) -> Result<Arc<ScalerParameters>> {
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| GuardError::ScalerUnavailable(format!("{}: {e}", path.display())))?;
    let params = ScalerParameters::from_json_str(&raw)?;
    info!(path = %path.display(), "scaler parameters loaded");
    Ok(Arc::new(params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        for (i, v) in values.iter_mut().enumerate() {
            *v = i as f64 * 1.5 - 10.0;
        }
        FeatureVector::new(values)
    }

    #[test]
    fn absent_params_is_identity() {
        let v = ramp();
        assert_eq!(Normalizer::new().apply(&v, None), v);
    }

    #[test]
    fn identity_params_round_trip() {
        let v = ramp();
        let params = ScalerParameters::identity();
        assert_eq!(Normalizer::new().apply(&v, Some(&params)), v);
    }

    #[test]
    fn standardizes_each_feature() {
        let mut params = ScalerParameters::identity();
        params.mean[0] = 10.0;
        params.std[0] = 2.0;
        let mut values = [0.0; FEATURE_COUNT];
        values[0] = 14.0;
        let out = Normalizer::new().apply(&FeatureVector::new(values), Some(&params));
        assert_eq!(out.get(0), Some(2.0));
        assert_eq!(out.get(1), Some(0.0));
    }

    #[test]
    fn zero_or_missing_std_treated_as_one() {
        let params = ScalerParameters {
            mean: vec![1.0; 3],
            std: vec![0.0; 3],
        };
        let v = FeatureVector::new([5.0; FEATURE_COUNT]);
        let out = Normalizer::new().apply(&v, Some(&params));
        assert_eq!(out.get(0), Some(4.0)); // zero std
        assert_eq!(out.get(10), Some(5.0)); // missing mean and std
        assert!(out.as_slice().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn parse_artifact() {
        let json = format!(
            r#"{{"mean": {:?}, "std": {:?}}}"#,
            vec![0.5; FEATURE_COUNT],
            vec![2.0; FEATURE_COUNT]
        );
        let params = ScalerParameters::from_json_str(&json).unwrap();
        assert_eq!(params.mean.len(), FEATURE_COUNT);
        assert_eq!(params.std[49], 2.0);
    }

    #[test]
    fn malformed_artifact_is_scaler_unavailable() {
        let err = ScalerParameters::from_json_str(r#"{"mean": []}"#).unwrap_err();
        assert!(matches!(err, GuardError::ScalerUnavailable(_)));
    }

    #[tokio::test]
    async fn missing_file_degrades_to_none() {
        let source = ScalerSource::from_file("/nonexistent/phishguard/scaler.json");
        assert!(!source.warned.load(Ordering::Relaxed));
        assert!(source.params().await.is_none());
        assert!(source.warned.load(Ordering::Relaxed));

        // Later failures still retry and still degrade.
        assert!(source.params().await.is_none());
        assert_eq!(source.loaded.attempts(), 2);
    }

    #[tokio::test]
    async fn file_source_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        let json = serde_json::to_string(&ScalerParameters::identity()).unwrap();
        tokio::fs::write(&path, json).await.unwrap();

        let source = ScalerSource::from_file(&path);
        let first = source.params().await.unwrap();

        // Deleting the file must not matter once loaded.
        tokio::fs::remove_file(&path).await.unwrap();
        let second = source.params().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn fixed_and_none_sources() {
        assert!(ScalerSource::none().params().await.is_none());
        let fixed = ScalerSource::fixed(ScalerParameters::identity());
        assert_eq!(*fixed.params().await.unwrap(), ScalerParameters::identity());
    }
}
