//! # phishguard-types
//!
//! Shared types for the phishguard page classifier.
//!
//! Contains the error taxonomy, the configuration schema, the
//! cross-context request/response protocol spoken between a caller and
//! an inference worker, and the risk tier a score maps to. This crate has
//! no async runtime dependency so it can be used from any context.

pub mod config;
pub mod error;
pub mod protocol;
pub mod verdict;

pub use error::{GuardError, Result};
