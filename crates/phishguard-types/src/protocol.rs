//! Cross-context message types.
//!
//! A caller sends a [`WorkerRequest`] to the inference worker and gets a
//! [`PredictResponse`] back. On the wire each message is wrapped in an
//! envelope carrying a correlation id so any number of requests can be in
//! flight at once.

use serde::{Deserialize, Serialize};

use crate::error::GuardError;

/// A request understood by the inference worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerRequest {
    /// Classify a page.
    #[serde(rename = "PREDICT")]
    Predict {
        /// Page address.
        url: String,
        /// Rendered HTML, or empty when it could not be captured.
        #[serde(default)]
        content: String,
    },
}

impl WorkerRequest {
    /// Build a `PREDICT` request.
    pub fn predict(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Predict {
            url: url.into(),
            content: content.into(),
        }
    }

    /// The wire name of this request kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Predict { .. } => "PREDICT",
        }
    }
}

/// Reply to a `PREDICT` request.
///
/// Serializes as `{"success": true, "score": 0.12}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Whether the prediction succeeded.
    pub success: bool,
    /// P(phishing) in `[0, 1]`, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Human-readable failure message, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictResponse {
    /// A successful reply.
    pub fn ok(score: f64) -> Self {
        Self {
            success: true,
            score: Some(score),
            error: None,
        }
    }

    /// A failed reply.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            score: None,
            error: Some(message.into()),
        }
    }

    /// Convert back into a score, mapping a failed reply to
    /// [`GuardError::ModelUnavailable`].
    pub fn into_score(self) -> crate::Result<f64> {
        match (self.success, self.score) {
            (true, Some(score)) => Ok(score),
            (true, None) => Err(GuardError::ModelUnavailable(
                "worker reported success without a score".into(),
            )),
            (false, _) => Err(GuardError::ModelUnavailable(
                self.error.unwrap_or_else(|| "prediction failed".into()),
            )),
        }
    }
}

impl From<crate::Result<f64>> for PredictResponse {
    fn from(result: crate::Result<f64>) -> Self {
        match result {
            Ok(score) => Self::ok(score),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// A request tagged with its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlation id, unique per router.
    pub id: u64,
    /// The request itself.
    pub request: WorkerRequest,
}

/// A reply tagged with the correlation id of the request it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Correlation id copied from the request.
    pub id: u64,
    /// The reply itself.
    pub response: PredictResponse,
}
