//! Inference model abstraction.
//!
//! A [`Model`] maps one standardized feature vector to a single raw output,
//! interpreted as P(legitimate). [`ModelLoader`] produces a model
//! asynchronously; the [`Classifier`](crate::classifier::Classifier) decides
//! when to call it.
//!
//! [`DenseModel`] is a small feed-forward network described in JSON. Other
//! runtimes plug in by implementing the two traits.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use phishguard_types::{GuardError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::features::{FEATURE_COUNT, FeatureVector};

/// A loaded inference model: 1x50 in, 1x1 out.
pub trait Model: Send + Sync {
    /// Evaluate the model. The result is P(legitimate).
    fn predict(&self, input: &FeatureVector) -> Result<f64>;

    /// Identifier for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Produces a [`Model`], usually by reading an artifact.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Load the model. Failures must be reported as
    /// [`GuardError::ModelUnavailable`].
    async fn load(&self) -> Result<Arc<dyn Model>>;
}

/// Layer activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Identity.
    #[default]
    Linear,
    /// `max(0, x)`.
    Relu,
    /// `1 / (1 + e^-x)`.
    Sigmoid,
    /// Hyperbolic tangent.
    Tanh,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Relu => x.max(0.0),
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
        }
    }
}

/// A fully connected layer. `weights[o][i]` connects input `i` to output `o`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// One row per output unit.
    pub weights: Vec<Vec<f64>>,
    /// One bias per output unit.
    pub bias: Vec<f64>,
    /// Applied to every output unit.
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| {
                let z: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b;
                self.activation.apply(z)
            })
            .collect()
    }
}

/// Feed-forward network of [`DenseLayer`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseModel {
    /// Layers applied in order.
    pub layers: Vec<DenseLayer>,
}

impl DenseModel {
    /// Build a model, checking that the layer shapes chain from
    /// [`FEATURE_COUNT`] inputs down to one output.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        let model = Self { layers };
        model.validate()?;
        Ok(model)
    }

    /// Parse and validate a JSON description.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: Self =
            serde_json::from_str(json).map_err(|e| GuardError::ModelUnavailable(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GuardError::ModelUnavailable(msg));
        if self.layers.is_empty() {
            return invalid("model has no layers".into());
        }
        let mut width = FEATURE_COUNT;
        for (n, layer) in self.layers.iter().enumerate() {
            if layer.weights.is_empty() || layer.weights.len() != layer.bias.len() {
                return invalid(format!(
                    "layer {n}: {} weight rows but {} biases",
                    layer.weights.len(),
                    layer.bias.len()
                ));
            }
            if let Some(row) = layer.weights.iter().find(|row| row.len() != width) {
                return invalid(format!(
                    "layer {n}: expected {width} inputs per unit, found {}",
                    row.len()
                ));
            }
            width = layer.weights.len();
        }
        if width != 1 {
            return invalid(format!("model must have 1 output, has {width}"));
        }
        Ok(())
    }
}

impl Model for DenseModel {
    fn predict(&self, input: &FeatureVector) -> Result<f64> {
        let out = self
            .layers
            .iter()
            .fold(input.as_slice().to_vec(), |acc, layer| layer.forward(&acc));
        match out.first() {
            Some(v) if v.is_finite() => Ok(*v),
            Some(v) => Err(GuardError::ModelUnavailable(format!(
                "model produced non-finite output {v}"
            ))),
            None => Err(GuardError::ModelUnavailable("model produced no output".into())),
        }
    }

    fn name(&self) -> &str {
        "dense"
    }
}

/// Loads a [`DenseModel`] from a JSON file.
pub struct FileModelLoader {
    path: PathBuf,
}

impl FileModelLoader {
    /// Create a loader for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ModelLoader for FileModelLoader {
    async fn load(&self) -> Result<Arc<dyn Model>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GuardError::ModelUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        let model = DenseModel::from_json_str(&raw)?;
        info!(
            path = %self.path.display(),
            layers = model.layers.len(),
            "model loaded"
        );
        Ok(Arc::new(model))
    }
}
