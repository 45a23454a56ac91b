//! # phishguard-core
//!
//! Scoring pipeline for the phishguard page classifier.
//!
//! Contains feature extraction, standard-score normalization, the lazily
//! loaded classifier, tier mapping, the navigation gate, and config
//! discovery. Everything that needs one-time async initialization goes
//! through [`flight::SingleFlight`].

pub mod classifier;
pub mod config_loader;
pub mod features;
pub mod flight;
pub mod gate;
pub mod model;
pub mod pipeline;
pub mod scaler;
pub mod tier;
