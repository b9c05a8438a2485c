//! Turns raw corpus bytes into the plain text the tokenizer consumes.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Node};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref BLANK_LINE: Regex = Regex::new(r"\r?\n\r?\n").expect("valid regex");
}

/// Drop everything before the second blank-line separator. Documents with
/// fewer than two separators are kept whole.
pub fn strip_header(raw: &str) -> &str {
    let Some(first) = BLANK_LINE.find(raw) else { return raw };
    match BLANK_LINE.find_at(raw, first.end()) {
        Some(second) => &raw[second.start()..],
        None => raw,
    }
}

/// Plain text of an HTML fragment or document; script and style bodies are skipped.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();
    for node in doc.root_element().descendants() {
        let Node::Text(text) = node.value() else { continue };
        let in_code = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| matches!(e.name(), "script" | "style")))
            .unwrap_or(false);
        if in_code {
            continue;
        }
        let t = text.trim();
        if !t.is_empty() {
            parts.push(t);
        }
    }
    parts.join(" ")
}

/// Full document preparation: lossy decode, header strip, HTML extraction, NFKC.
pub fn prepare_document(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);
    let body = strip_header(&raw);
    html_to_text(body).nfkc().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_ends_at_second_separator() {
        let raw = "HTTP/1.1 200\r\nServer: x\r\n\r\nmeta\r\n\r\n<p>body</p>";
        assert_eq!(strip_header(raw), "\r\n\r\n<p>body</p>");
    }

    #[test]
    fn short_documents_are_kept() {
        assert_eq!(strip_header("the cat sat"), "the cat sat");
        assert_eq!(strip_header("head\n\nthe cat sat"), "head\n\nthe cat sat");
    }

    #[test]
    fn extracts_visible_text() {
        let text = html_to_text("<html><head><style>p{}</style></head><body><p>Hello</p><p>world</p><script>var x;</script></body></html>");
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(prepare_document(b"the cat sat"), "the cat sat");
    }
}
