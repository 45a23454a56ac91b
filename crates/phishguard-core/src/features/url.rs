//! URL-derived features (positions 0..22).
//!
//! Lengths and counts are measured in characters of the raw input string,
//! not of the normalized URL; the host and scheme come from the parsed
//! form.

use std::collections::BTreeMap;

use ::url::{Host, Url};

/// Number of features in the URL group.
pub const URL_FEATURE_COUNT: usize = 22;

/// TLDs treated as likely legitimate.
const COMMON_TLDS: &[&str] = &["com", "org", "net", "edu", "gov", "io", "co", "id"];

const COMMON_TLD_PROB: f64 = 0.9;
const UNCOMMON_TLD_PROB: f64 = 0.3;

/// Short URLs on short hosts score higher on the similarity heuristic.
const SIMILARITY_SHORT: f64 = 80.0;
const SIMILARITY_LONG: f64 = 50.0;

/// Compute the URL group for `raw`, already parsed as `parsed`.
pub fn url_features(raw: &str, parsed: &Url) -> [f64; URL_FEATURE_COUNT] {
    let host = parsed.host_str().unwrap_or_default();
    let chars: Vec<char> = raw.chars().collect();
    let url_len = chars.len();
    let host_len = host.chars().count();

    let tld = host.rsplit('.').next().unwrap_or_default();
    let labels = host.split('.').count();

    let obfuscated = count_percent_escapes(raw);
    let letters = chars.iter().filter(|c| c.is_ascii_alphabetic()).count();
    let digits = chars.iter().filter(|c| c.is_ascii_digit()).count();
    let specials = chars
        .iter()
        .filter(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace())
        .count();

    [
        url_len as f64,
        host_len as f64,
        flag(matches!(parsed.host(), Some(Host::Ipv4(_)))),
        if url_len < 50 && host_len < 20 {
            SIMILARITY_SHORT
        } else {
            SIMILARITY_LONG
        },
        ratio(longest_run(&chars), url_len),
        if COMMON_TLDS.contains(&tld) {
            COMMON_TLD_PROB
        } else {
            UNCOMMON_TLD_PROB
        },
        1.0 / (shannon_entropy(raw) + 1.0),
        tld.chars().count() as f64,
        labels.saturating_sub(2) as f64,
        flag(obfuscated > 0),
        obfuscated as f64,
        ratio(obfuscated, url_len),
        letters as f64,
        ratio(letters, url_len),
        digits as f64,
        ratio(digits, url_len),
        count_char(&chars, '=') as f64,
        count_char(&chars, '?') as f64,
        count_char(&chars, '&') as f64,
        specials as f64,
        ratio(specials, url_len),
        flag(parsed.scheme() == "https"),
    ]
}

/// Shannon entropy (base 2) of the character distribution of `s`.
///
/// Returns 0 for the empty string. Frequencies are summed in character
/// order so the result is bit-for-bit reproducible.
pub fn shannon_entropy(s: &str) -> f64 {
    let mut freq: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    let len = total as f64;
    freq.values()
        .map(|&n| {
            let p = n as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Length of the longest run of one repeated character.
fn longest_run(chars: &[char]) -> usize {
    let mut best = 0;
    let mut run = 0;
    let mut prev = None;
    for &c in chars {
        if prev == Some(c) {
            run += 1;
        } else {
            run = 1;
            prev = Some(c);
        }
        best = best.max(run);
    }
    best
}

/// Count non-overlapping `%XX` escapes with two hex digits.
fn count_percent_escapes(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
        {
            count += 1;
            i += 3;
        } else {
            i += 1;
        }
    }
    count
}

fn count_char(chars: &[char], needle: char) -> usize {
    chars.iter().filter(|&&c| c == needle).count()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}
