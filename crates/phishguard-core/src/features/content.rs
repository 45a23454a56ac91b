//! Page-derived features (positions 22..50).
//!
//! Computed from the parsed HTML when at least [`MIN_CONTENT_CHARS`]
//! characters of content were captured. Otherwise every feature in this
//! group is zero: missing evidence must never read as evidence of safety.

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

/// Number of features in the page group.
pub const CONTENT_FEATURE_COUNT: usize = 28;

/// Content must be strictly longer than this to be analyzed.
pub const MIN_CONTENT_CHARS: usize = 100;

const MATCH_SCORE: f64 = 100.0;

const SOCIAL_NETWORKS: &[&str] = &["facebook", "twitter", "instagram", "linkedin"];

/// Hrefs that go nowhere.
const EMPTY_HREFS: &[&str] = &["", "#", "javascript:void(0)"];

/// Whether `content` carries enough markup to be analyzed.
pub fn has_content(content: &str) -> bool {
    content.chars().count() > MIN_CONTENT_CHARS
}

/// Compute the page group for `raw_url` (parsed as `parsed`) and its HTML.
pub fn content_features(
    raw_url: &str,
    parsed: &Url,
    content: &str,
) -> [f64; CONTENT_FEATURE_COUNT] {
    if !has_content(content) {
        return [0.0; CONTENT_FEATURE_COUNT];
    }

    let doc = Html::parse_document(content);
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let lower = content.to_lowercase();
    let title = page_title(&doc);
    let hrefs = anchor_hrefs(&doc);

    let lines = content.split('\n');
    let line_count = lines.clone().count();
    let longest_line = lines.map(|l| l.chars().count()).max().unwrap_or(0);

    let refers_to_host = |href: &str| !host.is_empty() && href.contains(host.as_str());
    let self_refs = hrefs
        .iter()
        .filter(|h| refers_to_host(h) || h.starts_with('/') || h.starts_with('#'))
        .count();
    let empty_refs = hrefs
        .iter()
        .filter(|h| EMPTY_HREFS.contains(&h.as_str()))
        .count();
    let external_refs = hrefs
        .iter()
        .filter(|h| h.starts_with("http") && !refers_to_host(h))
        .count();

    let external_form = attr_values(&doc, "form", "action")
        .iter()
        .any(|action| action.starts_with("http") && !refers_to_host(action));

    [
        line_count as f64,
        longest_line as f64,
        flag(!title.is_empty()),
        domain_title_match(&host, &title),
        if !title.is_empty() && title.contains(raw_url) {
            MATCH_SCORE
        } else {
            0.0
        },
        flag(exists(&doc, r#"link[rel*="icon"]"#)),
        flag(lower.contains("robots")),
        flag(exists(&doc, r#"meta[name="viewport"]"#) || content.contains("@media")),
        // Redirect history is not observable from a single page capture.
        0.0,
        0.0,
        flag(exists(&doc, r#"meta[name="description"]"#)),
        lower.matches("window.open").count() as f64,
        count(&doc, "iframe") as f64,
        flag(external_form),
        flag(SOCIAL_NETWORKS.iter().any(|s| lower.contains(s))),
        flag(exists(&doc, r#"input[type="submit"], button[type="submit"]"#)),
        flag(exists(&doc, r#"input[type="hidden"]"#)),
        flag(exists(&doc, r#"input[type="password"]"#)),
        flag(lower.contains("bank")),
        flag(lower.contains("pay")),
        flag(lower.contains("crypto") || lower.contains("bitcoin")),
        flag(lower.contains("copyright") || content.contains('\u{a9}')),
        count(&doc, "img") as f64,
        count(&doc, r#"link[rel="stylesheet"], style"#) as f64,
        count(&doc, "script") as f64,
        self_refs as f64,
        empty_refs as f64,
        external_refs as f64,
    ]
}

/// Score 100 when the title mentions the first label of the host, or the
/// host contains the first word of the title. The first `www.` anywhere in
/// the host is ignored.
fn domain_title_match(host: &str, title: &str) -> f64 {
    if title.is_empty() {
        return 0.0;
    }
    let domain = host.replacen("www.", "", 1);
    let word = domain.split('.').next().unwrap_or_default();
    let first_title_word = title.split(' ').next().unwrap_or_default();
    if (!word.is_empty() && title.contains(word)) || word.contains(first_title_word) {
        MATCH_SCORE
    } else {
        0.0
    }
}

/// Lowercased `<title>` text with whitespace collapsed.
fn page_title(doc: &Html) -> String {
    let Some(sel) = selector("title") else {
        return String::new();
    };
    doc.select(&sel)
        .next()
        .map(|el| {
            el.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .unwrap_or_default()
}

/// `href` of every anchor; a missing attribute reads as empty.
fn anchor_hrefs(doc: &Html) -> Vec<String> {
    let Some(sel) = selector("a") else {
        return Vec::new();
    };
    doc.select(&sel)
        .map(|a| a.value().attr("href").unwrap_or_default().to_string())
        .collect()
}

/// Values of `attr` on every `tag` element that carries it.
fn attr_values(doc: &Html, tag: &str, attr: &str) -> Vec<String> {
    let Some(sel) = selector(tag) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|el| el.value().attr(attr).map(str::to_string))
        .collect()
}

fn count(doc: &Html, css: &str) -> usize {
    selector(css).map_or(0, |sel| doc.select(&sel).count())
}

fn exists(doc: &Html, css: &str) -> bool {
    selector(css).is_some_and(|sel| doc.select(&sel).next().is_some())
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector = css, error = ?e, "invalid CSS selector");
            None
        }
    }
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAD: &str = "<!-- padding padding padding padding padding padding padding padding padding padding padding -->";

    fn features(url: &str, html: &str) -> [f64; CONTENT_FEATURE_COUNT] {
        content_features(url, &Url::parse(url).unwrap(), html)
    }

    fn page(head: &str, body: &str) -> String {
        format!("<html><head>{head}</head><body>{PAD}\n{body}</body></html>")
    }

    #[test]
    fn missing_content_is_all_zero() {
        assert_eq!(features("https://example.com", ""), [0.0; CONTENT_FEATURE_COUNT]);
    }

    #[test]
    fn short_content_is_all_zero() {
        let short = "<html><title>Example</title><input type=password></html>";
        assert!(!has_content(short));
        assert_eq!(features("https://example.com", short), [0.0; CONTENT_FEATURE_COUNT]);
    }

    #[test]
    fn exactly_threshold_is_not_enough() {
        let content = "a".repeat(MIN_CONTENT_CHARS);
        assert!(!has_content(&content));
        assert!(has_content(&format!("{content}b")));
    }

    #[test]
    fn head_features() {
        let html = page(
            r#"<title> Example   Store </title>
               <link rel="shortcut icon" href="/favicon.ico">
               <meta name="viewport" content="width=device-width">
               <meta name="description" content="shop">
               <link rel="stylesheet" href="/a.css"><style>p{}</style>
               <script src="/a.js"></script>"#,
            "",
        );
        let f = features("https://www.example.com/", &html);
        assert_eq!(f[2], 1.0); // title
        assert_eq!(f[3], 100.0); // "example" in title
        assert_eq!(f[4], 0.0);
        assert_eq!(f[5], 1.0); // favicon
        assert_eq!(f[7], 1.0); // viewport
        assert_eq!(f[8], 0.0);
        assert_eq!(f[9], 0.0);
        assert_eq!(f[10], 1.0); // description
        assert_eq!(f[23], 2.0); // css
        assert_eq!(f[24], 1.0); // js
    }

    #[test]
    fn empty_title_does_not_match_domain() {
        let html = page("<title>  </title>", "");
        let f = features("https://example.com", &html);
        assert_eq!(f[2], 0.0);
        assert_eq!(f[3], 0.0);
    }

    #[test]
    fn www_is_dropped_wherever_it_first_appears() {
        assert_eq!(domain_title_match("mywww.shop.com", "myshop deals"), 100.0);
        assert_eq!(domain_title_match("www.shop.com", "shop deals"), 100.0);
        assert_eq!(domain_title_match("mywww.shop.com", "mywww deals"), 0.0);
    }

    #[test]
    fn form_features() {
        let html = page(
            "<title>Sign in</title>",
            r#"<form action="https://collector.tk/steal">
                 <input type="hidden" name="t" value="1">
                 <input type="password" name="p">
                 <button type="submit">Go</button>
               </form>
               <iframe src="https://x.tk"></iframe><iframe></iframe>"#,
        );
        let f = features("https://example.com/login", &html);
        assert_eq!(f[12], 2.0); // iframes
        assert_eq!(f[13], 1.0); // external form
        assert_eq!(f[15], 1.0); // submit
        assert_eq!(f[16], 1.0); // hidden
        assert_eq!(f[17], 1.0); // password
    }

    #[test]
    fn same_host_form_is_not_external() {
        let html = page("", r#"<form action="https://example.com/post"></form><form action="/rel"></form>"#);
        let f = features("https://example.com", &html);
        assert_eq!(f[13], 0.0);
    }

    #[test]
    fn keyword_features() {
        let html = page(
            "",
            "Online BANKING and Payment with Bitcoin. Follow us on Twitter. \
             Copyright 2024. window.open('a'); WINDOW.OPEN('b'); robots",
        );
        let f = features("https://example.com", &html);
        assert_eq!(f[6], 1.0); // robots
        assert_eq!(f[11], 2.0); // popups
        assert_eq!(f[14], 1.0); // social
        assert_eq!(f[18], 1.0); // bank
        assert_eq!(f[19], 1.0); // pay
        assert_eq!(f[20], 1.0); // crypto
        assert_eq!(f[21], 1.0); // copyright
    }

    #[test]
    fn copyright_sign_counts() {
        let html = page("", "\u{a9} Example Ltd");
        assert_eq!(features("https://example.com", &html)[21], 1.0);
    }

    #[test]
    fn anchor_classification() {
        let html = page(
            "",
            r##"<a href="/home">1</a>
                <a href="#top">2</a>
                <a href="https://example.com/about">3</a>
                <a href="https://other.net/">4</a>
                <a href="http://tracker.io/x">5</a>
                <a href="">6</a>
                <a href="javascript:void(0)">7</a>
                <a>8</a>"##,
        );
        let f = features("https://example.com", &html);
        assert_eq!(f[25], 3.0); // self: /home, #top, example.com/about
        assert_eq!(f[26], 3.0); // empty: "", void, missing
        assert_eq!(f[27], 2.0); // external
    }

    #[test]
    fn bare_hash_is_both_self_and_empty() {
        let html = page("", r##"<a href="#">x</a>"##);
        let f = features("https://example.com", &html);
        assert_eq!(f[25], 1.0);
        assert_eq!(f[26], 1.0);
    }

    #[test]
    fn line_metrics() {
        let html = page("", "short\nline");
        let f = features("https://example.com", &html);
        assert_eq!(f[0], 3.0);
        assert_eq!(f[1], html.split('\n').map(str::len).max().unwrap() as f64);
    }

    #[test]
    fn images_counted() {
        let html = page("", "<img src=a.png><img src=b.png><img>");
        assert_eq!(features("https://example.com", &html)[22], 3.0);
    }
}
