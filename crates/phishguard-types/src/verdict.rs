//! Risk tiers and verdicts.

use serde::{Deserialize, Serialize};

/// Discrete risk bucket derived from a phishing score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Percentage 0 to 25.
    Safe,
    /// Percentage 26 to 50.
    Warning,
    /// Percentage 51 to 100.
    Phishing,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Warning => write!(f, "warning"),
            Self::Phishing => write!(f, "phishing"),
        }
    }
}

/// A classified score, as rendered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// P(phishing) in `[0, 1]`.
    pub score: f64,
    /// `round(score * 100)`.
    pub percentage: u8,
    /// Tier the percentage falls in.
    pub tier: Tier,
}
