//! Navigation gating.
//!
//! Decides whether a navigation should be routed through the classifier at
//! all. Only top-level http(s) navigations are candidates; internal pages,
//! URLs carrying the one-time verified marker, and hosts covered by the
//! trust policy pass straight through.

use std::sync::Arc;

use phishguard_types::config::GateConfig;
use tracing::debug;
use url::Url;

/// Browser-internal schemes, reported separately from other non-web
/// schemes.
const INTERNAL_SCHEMES: &[&str] = &[
    "about",
    "chrome",
    "chrome-extension",
    "chrome-search",
    "devtools",
    "edge",
    "moz-extension",
    "view-source",
];

/// Which frame a navigation happens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The top-level document.
    Main,
    /// An iframe or other sub-resource.
    Sub,
}

/// Why a navigation was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a main-frame navigation.
    SubFrame,
    /// The URL does not parse.
    InvalidUrl,
    /// A browser-internal page.
    InternalPage,
    /// Neither http nor https.
    UnsupportedScheme,
    /// Carries the verified marker.
    Verified,
    /// Host matches a trusted domain.
    TrustedDomain,
    /// Host ends in a trusted suffix.
    TrustedTld,
}

/// Outcome of [`NavigationGate::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Route through the classifier.
    Intercept,
    /// Let the navigation proceed untouched.
    Skip(SkipReason),
}

impl GateDecision {
    /// Whether the navigation should be classified.
    pub fn should_intercept(self) -> bool {
        self == Self::Intercept
    }
}

/// Which kind of trust entry a host matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustMatch {
    /// Exact or subdomain match on a trusted domain.
    Domain,
    /// Suffix match on a trusted TLD.
    Tld,
}

/// Pluggable host trust predicate.
pub trait TrustPolicy: Send + Sync {
    /// How `host` (lowercase, no trailing dot) is trusted, if at all.
    fn trust(&self, host: &str) -> Option<TrustMatch>;
}

/// Trust by label-aligned suffix against configured lists.
///
/// `google.com` trusts `google.com` and `mail.google.com` but not
/// `evilgoogle.com`. Each check is linear in the number of entries.
#[derive(Debug, Clone, Default)]
pub struct SuffixTrustList {
    domains: Vec<String>,
    tlds: Vec<String>,
}

impl SuffixTrustList {
    /// Build from raw entries; case, leading `*.`/`.` and trailing dots
    /// are normalized away and empty entries dropped.
    pub fn new<I, J>(domains: I, tlds: J) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
    {
        Self {
            domains: normalize_entries(domains),
            tlds: normalize_entries(tlds),
        }
    }
}

impl TrustPolicy for SuffixTrustList {
    fn trust(&self, host: &str) -> Option<TrustMatch> {
        if self.domains.iter().any(|d| suffix_match(host, d)) {
            return Some(TrustMatch::Domain);
        }
        if self.tlds.iter().any(|t| suffix_match(host, t)) {
            return Some(TrustMatch::Tld);
        }
        None
    }
}

fn normalize_entries<I>(entries: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    entries
        .into_iter()
        .map(|e| {
            let e = e.as_ref().trim().to_lowercase();
            let e = e.strip_prefix("*.").unwrap_or(&e);
            e.trim_matches('.').to_string()
        })
        .filter(|e| !e.is_empty())
        .collect()
}

/// `host` equals `entry` or ends with `.entry`.
fn suffix_match(host: &str, entry: &str) -> bool {
    host == entry
        || host
            .strip_suffix(entry)
            .is_some_and(|rest| rest.ends_with('.'))
}

/// Decides which navigations are classified.
pub struct NavigationGate {
    policy: Arc<dyn TrustPolicy>,
    verified_marker: String,
}

impl NavigationGate {
    /// Build a gate from configuration.
    pub fn new(config: &GateConfig) -> Self {
        Self::with_policy(
            Arc::new(SuffixTrustList::new(
                &config.trusted_domains,
                &config.trusted_tlds,
            )),
            config.verified_marker.clone(),
        )
    }

    /// Build a gate around a custom trust policy.
    pub fn with_policy(policy: Arc<dyn TrustPolicy>, verified_marker: impl Into<String>) -> Self {
        Self {
            policy,
            verified_marker: verified_marker.into(),
        }
    }

    /// Decide whether a navigation to `url` in `frame` is intercepted.
    pub fn decide(&self, url: &str, frame: FrameKind) -> GateDecision {
        let decision = self.evaluate(url, frame);
        debug!(url = %url, ?decision, "navigation gate");
        decision
    }

    fn evaluate(&self, url: &str, frame: FrameKind) -> GateDecision {
        use GateDecision::Skip;

        if frame != FrameKind::Main {
            return Skip(SkipReason::SubFrame);
        }
        let Ok(parsed) = Url::parse(url) else {
            return Skip(SkipReason::InvalidUrl);
        };
        match parsed.scheme() {
            "http" | "https" => {}
            s if INTERNAL_SCHEMES.contains(&s) => return Skip(SkipReason::InternalPage),
            _ => return Skip(SkipReason::UnsupportedScheme),
        }
        if self.is_verified(&parsed) {
            return Skip(SkipReason::Verified);
        }
        let Some(host) = parsed.host_str() else {
            return Skip(SkipReason::InvalidUrl);
        };
        match self.policy.trust(host.trim_end_matches('.')) {
            Some(TrustMatch::Domain) => Skip(SkipReason::TrustedDomain),
            Some(TrustMatch::Tld) => Skip(SkipReason::TrustedTld),
            None => GateDecision::Intercept,
        }
    }

    fn is_verified(&self, parsed: &Url) -> bool {
        !self.verified_marker.is_empty()
            && parsed
                .fragment()
                .is_some_and(|f| f.split('&').any(|part| part == self.verified_marker))
    }

    /// Append the verified marker to `url` so the next navigation to it
    /// is let through once.
    pub fn mark_verified(&self, url: &str) -> String {
        let sep = if url.contains('#') { '&' } else { '#' };
        format!("{url}{sep}{}", self.verified_marker)
    }
}
