use crate::platform::{Span, SpanKind};

use super::utf16::{self, Utf16Text};

/// Render message text and its spans as HTML-like markup.
///
/// Spans are assumed flat and non-overlapping. Text is embedded verbatim,
/// without escaping `<`, `>` or `&`.
pub fn render(text: &str, spans: &[Span]) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = Utf16Text::new(text);
    let mut sorted: Vec<&Span> = spans.iter().collect();
    sorted.sort_by_key(|span| span.offset);

    let mut out: Vec<u16> = Vec::with_capacity(text.len() + spans.len() * 16);
    let mut current_index = 0;

    for span in sorted {
        let start = span.offset;
        let end = start.saturating_add(span.length);

        out.extend_from_slice(text.slice(current_index, start));
        wrap(&mut out, span, text.slice(start, end));

        current_index = end;
    }

    out.extend_from_slice(text.slice(current_index, text.len()));
    utf16::decode(&out)
}

fn wrap(out: &mut Vec<u16>, span: &Span, inner: &[u16]) {
    match span.kind {
        SpanKind::Bold => tagged(out, "b", inner),
        SpanKind::Italic => tagged(out, "i", inner),
        SpanKind::Underline => tagged(out, "u", inner),
        SpanKind::Strikethrough => tagged(out, "s", inner),
        SpanKind::Code => tagged(out, "code", inner),
        SpanKind::Pre => tagged(out, "pre", inner),
        SpanKind::Url => {
            push_str(out, "<a href=\"");
            out.extend_from_slice(inner);
            push_str(out, "\">");
            out.extend_from_slice(inner);
            push_str(out, "</a>");
        }
        SpanKind::TextLink => {
            push_str(out, "<a href=\"");
            push_str(out, span.extra.as_deref().unwrap_or_default());
            push_str(out, "\">");
            out.extend_from_slice(inner);
            push_str(out, "</a>");
        }
        SpanKind::Other => out.extend_from_slice(inner),
    }
}

fn tagged(out: &mut Vec<u16>, tag: &str, inner: &[u16]) {
    push_str(out, "<");
    push_str(out, tag);
    push_str(out, ">");
    out.extend_from_slice(inner);
    push_str(out, "</");
    push_str(out, tag);
    push_str(out, ">");
}

fn push_str(out: &mut Vec<u16>, s: &str) {
    out.extend(s.encode_utf16());
}
