//! Error types for phishguard.
//!
//! [`GuardError`] is the single error type shared by every crate in the
//! workspace. It is `Clone` so one failed single-flight attempt can be
//! handed to every caller that joined it.

use thiserror::Error;

/// Top-level error type for phishguard.
///
/// Only [`ModelUnavailable`](GuardError::ModelUnavailable),
/// [`WorkerCreationFailed`](GuardError::WorkerCreationFailed),
/// [`Timeout`](GuardError::Timeout) and
/// [`ChannelClosed`](GuardError::ChannelClosed) ever reach a caller of
/// the router. The other variants are absorbed where they occur and
/// logged.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GuardError {
    /// The URL could not be parsed.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// Scaler parameters could not be loaded or are malformed.
    #[error("scaler parameters unavailable: {0}")]
    ScalerUnavailable(String),

    /// The inference model could not be loaded or evaluated.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The inference worker context could not be created.
    #[error("worker creation failed: {0}")]
    WorkerCreationFailed(String),

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        /// Human-readable name of the operation that timed out.
        operation: String,
        /// The deadline that elapsed, in milliseconds.
        after_ms: u64,
    },

    /// The worker dropped a request without replying.
    #[error("channel closed")]
    ChannelClosed,

    /// Configuration is unreadable or malformed.
    #[error("invalid config: {0}")]
    Config(String),
}

impl GuardError {
    /// Whether a later attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable(_)
                | Self::WorkerCreationFailed(_)
                | Self::Timeout { .. }
                | Self::ChannelClosed
        )
    }
}

/// Convenience alias for results in phishguard.
pub type Result<T> = std::result::Result<T, GuardError>;
