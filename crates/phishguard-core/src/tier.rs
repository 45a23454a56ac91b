//! Score to tier mapping.
//!
//! The score is scaled to a whole percentage first; boundaries are
//! inclusive on the lower-risk side.

use phishguard_types::verdict::{Tier, Verdict};

/// Highest percentage still considered safe.
pub const SAFE_MAX_PERCENT: u8 = 25;
/// Highest percentage still considered a warning.
pub const WARNING_MAX_PERCENT: u8 = 50;

/// Stateless score classifier.
pub struct ScoreClassifier;

impl ScoreClassifier {
    /// `round(score * 100)`, clamped to `0..=100`. NaN maps to 100.
    pub fn percentage(score: f64) -> u8 {
        if score.is_nan() {
            return 100;
        }
        (score * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// Tier for a score.
    pub fn tier(score: f64) -> Tier {
        Self::tier_for_percentage(Self::percentage(score))
    }

    /// Tier for an already-scaled percentage.
    pub fn tier_for_percentage(percentage: u8) -> Tier {
        match percentage {
            0..=SAFE_MAX_PERCENT => Tier::Safe,
            p if p <= WARNING_MAX_PERCENT => Tier::Warning,
            _ => Tier::Phishing,
        }
    }

    /// Full verdict for a score.
    pub fn verdict(score: f64) -> Verdict {
        let percentage = Self::percentage(score);
        Verdict {
            score,
            percentage,
            tier: Self::tier_for_percentage(percentage),
        }
    }
}
