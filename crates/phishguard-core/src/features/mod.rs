//! Feature extraction.
//!
//! Turns a URL and (optionally) its rendered HTML into a [`FeatureVector`]
//! of exactly [`FEATURE_COUNT`] values. Positions are fixed: the model was
//! trained against this exact ordering, so an index must never move.
//!
//! | Positions | Group | Source |
//! |-----------|-------|--------|
//! | 0..22     | URL   | [`url`] |
//! | 22..50    | page  | [`content`] |
//!
//! Extraction never fails. A URL that does not parse yields the zero
//! vector and a warning.

pub mod content;
pub mod url;

use phishguard_types::{GuardError, Result};
use tracing::{debug, warn};

/// Number of features the model consumes.
pub const FEATURE_COUNT: usize = 50;

/// Stable column name for every position, in order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    // URL group
    "url_length",
    "domain_length",
    "is_domain_ip",
    "url_similarity_index",
    "char_continuation_rate",
    "tld_legitimate_prob",
    "url_char_prob",
    "tld_length",
    "no_of_subdomain",
    "has_obfuscation",
    "no_of_obfuscated_char",
    "obfuscation_ratio",
    "no_of_letters_in_url",
    "letter_ratio_in_url",
    "no_of_digits_in_url",
    "digit_ratio_in_url",
    "no_of_equals_in_url",
    "no_of_qmark_in_url",
    "no_of_ampersand_in_url",
    "no_of_other_special_chars_in_url",
    "special_char_ratio_in_url",
    "is_https",
    // page group
    "line_of_code",
    "largest_line_length",
    "has_title",
    "domain_title_match_score",
    "url_title_match_score",
    "has_favicon",
    "robots",
    "is_responsive",
    "no_of_url_redirect",
    "no_of_self_redirect",
    "has_description",
    "no_of_popup",
    "no_of_iframe",
    "has_external_form_submit",
    "has_social_net",
    "has_submit_button",
    "has_hidden_fields",
    "has_password_field",
    "bank",
    "pay",
    "crypto",
    "has_copyright_info",
    "no_of_image",
    "no_of_css",
    "no_of_js",
    "no_of_self_ref",
    "no_of_empty_ref",
    "no_of_external_ref",
];

/// An immutable, fixed-length feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// The all-zero vector returned for unparseable input.
    pub const fn zeros() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    /// Wrap raw values.
    pub const fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Value at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// Borrow the values in order.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Always [`FEATURE_COUNT`].
    pub const fn len(&self) -> usize {
        FEATURE_COUNT
    }

    /// Always `false`.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate `(name, value)` pairs, for logging.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }

    /// Apply `f` to every `(index, value)` and collect a new vector.
    pub fn map_indexed(&self, mut f: impl FnMut(usize, f64) -> f64) -> Self {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, (slot, value)) in out.iter_mut().zip(self.0.iter()).enumerate() {
            *slot = f(i, *value);
        }
        Self(out)
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeros()
    }
}

/// Derives the feature vector for a page.
///
/// Stateless; one instance can be shared freely.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract the feature vector for `url` and its HTML `content`.
    ///
    /// `content` may be empty. Short or missing content leaves every page
    /// feature at zero rather than at a value that would look safe.
    pub fn extract(&self, url: &str, content: &str) -> FeatureVector {
        let parsed = match parse_url(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "using zero feature vector");
                return FeatureVector::zeros();
            }
        };

        let url_part = url::url_features(url, &parsed);
        let page_part = content::content_features(url, &parsed, content);

        let mut values = [0.0; FEATURE_COUNT];
        values[..url::URL_FEATURE_COUNT].copy_from_slice(&url_part);
        values[url::URL_FEATURE_COUNT..].copy_from_slice(&page_part);

        debug!(url = %url, content_len = content.len(), "features extracted");
        FeatureVector(values)
    }
}

/// Parse an absolute URL.
pub fn parse_url(raw: &str) -> Result<::url::Url> {
    ::url::Url::parse(raw).map_err(|e| GuardError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

const _: () = assert!(url::URL_FEATURE_COUNT + content::CONTENT_FEATURE_COUNT == FEATURE_COUNT);
