use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::platform::{Span, SpanKind};

use super::utf16::Utf16Text;

/// Bare `http(s)://` links in plain text: everything up to whitespace, `"` or `>`
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s">]+"#).expect("URL pattern is valid"));

/// Collect every URL a message references.
///
/// The plain-text scan runs independently of the spans, so a URL covered by a
/// `Url` span is found twice and collapses to one entry. A bare URL inside a
/// `TextLink`'s visible text is kept alongside the link's destination even
/// when one is a prefix of the other.
pub fn extract_urls(text: &str, spans: &[Span]) -> BTreeSet<String> {
    let mut urls: BTreeSet<String> = URL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();

    // Only built when a Url span needs slicing
    let mut units: Option<Utf16Text> = None;
    for span in spans {
        match span.kind {
            SpanKind::Url => {
                let units = units.get_or_insert_with(|| Utf16Text::new(text));
                urls.insert(
                    units.substring(span.offset, span.offset.saturating_add(span.length)),
                );
            }
            SpanKind::TextLink => {
                if let Some(url) = &span.extra {
                    urls.insert(url.clone());
                }
            }
            _ => {}
        }
    }

    urls
}

/// Storage form of a URL set: comma-and-space separated
pub fn join_urls(urls: &BTreeSet<String>) -> String {
    urls.iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_text_urls() {
        let urls = extract_urls("See https://a.com and https://b.com", &[]);
        assert_eq!(urls, set(&["https://a.com", "https://b.com"]));
    }

    #[test]
    fn test_url_span_deduplicates_with_plain_text() {
        let spans = [Span::new(SpanKind::Url, 6, 19)];
        let urls = extract_urls("Visit https://example.com", &spans);
        assert_eq!(urls, set(&["https://example.com"]));
    }

    #[test]
    fn test_text_link_uses_destination() {
        let spans = [Span::text_link(0, 10, "https://example.com/page")];
        let urls = extract_urls("Click here", &spans);
        assert_eq!(urls, set(&["https://example.com/page"]));
    }

    #[test]
    fn test_text_link_and_bare_url_are_not_merged() {
        let text = "http://x.io/a";
        let spans = [Span::text_link(0, 13, "http://x.io/a?ref=1")];
        let urls = extract_urls(text, &spans);
        assert_eq!(urls, set(&["http://x.io/a", "http://x.io/a?ref=1"]));
    }

    #[test]
    fn test_scan_stops_at_quote_and_angle_bracket() {
        let urls = extract_urls(r#"<a href="https://q.com">x</a> https://r.com>tail"#, &[]);
        assert_eq!(urls, set(&["https://q.com", "https://r.com"]));
    }

    #[test]
    fn test_url_span_after_emoji() {
        // "🔥 " is three UTF-16 units
        let text = "🔥 example.org rocks";
        let spans = [Span::new(SpanKind::Url, 3, 11)];
        assert_eq!(extract_urls(text, &spans), set(&["example.org"]));
    }

    #[test]
    fn test_formatting_spans_are_ignored() {
        let spans = [
            Span::new(SpanKind::Bold, 0, 4),
            Span::new(SpanKind::Code, 5, 3),
        ];
        assert!(extract_urls("bold and", &spans).is_empty());
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_urls("", &[]).is_empty());
        let spans = [Span::text_link(0, 0, "https://only.link")];
        assert_eq!(extract_urls("", &spans), set(&["https://only.link"]));
    }

    #[test]
    fn test_empty_url_span_is_kept() {
        let spans = [Span::new(SpanKind::Url, 0, 0)];
        assert_eq!(
            extract_urls("see https://a.com", &spans),
            set(&["", "https://a.com"])
        );
    }

    #[test]
    fn test_out_of_range_url_span_yields_empty_entry() {
        let spans = [Span::new(SpanKind::Url, 40, 5)];
        assert_eq!(extract_urls("short", &spans), set(&[""]));
    }

    #[test]
    fn test_empty_text_link_destination_is_kept() {
        let spans = [Span::text_link(0, 5, "")];
        assert_eq!(extract_urls("click", &spans), set(&[""]));
        assert!(extract_urls("click", &[Span::new(SpanKind::TextLink, 0, 5)]).is_empty());
    }

    #[test]
    fn test_join_urls() {
        assert_eq!(join_urls(&BTreeSet::new()), "");
        assert_eq!(
            join_urls(&set(&["https://b.com", "https://a.com"])),
            "https://a.com, https://b.com"
        );
    }

    proptest! {
        #[test]
        fn prop_every_url_is_found_once(
            hosts in prop::collection::vec("[a-z]{1,8}", 1..5),
            filler in "[a-z😀 ]{0,10}",
        ) {
            let text = hosts
                .iter()
                .map(|h| format!("https://{h}.com"))
                .chain(hosts.iter().map(|h| format!("https://{h}.com")))
                .collect::<Vec<_>>()
                .join(&format!(" {filler} "));
            let urls = extract_urls(&text, &[]);
            let expected: BTreeSet<String> =
                hosts.iter().map(|h| format!("https://{h}.com")).collect();
            prop_assert_eq!(urls, expected);
        }
    }
}
