use once_cell::sync::Lazy;
use regex::Regex;

use super::text::{collapse_whitespace, decode_entities, strip_tags, truncate_chars};

static PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").expect("paragraph pattern"));
static NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)(?:\s[^>]*)?>.*?</(script|style|noscript)>")
        .expect("noise pattern")
});

/// Plain text of every `<p>` on the page, paragraphs separated by blank lines.
///
/// Returns `None` when the page has no paragraph text.
pub fn extract_article_text(html: &str, max_chars: usize) -> Option<String> {
    let cleaned = NOISE_RE.replace_all(html, " ");
    let paragraphs: Vec<String> = PARAGRAPH_RE
        .captures_iter(&cleaned)
        .map(|caps| collapse_whitespace(&decode_entities(&strip_tags(&caps[1]))))
        .filter(|text| !text.is_empty())
        .collect();
    if paragraphs.is_empty() {
        return None;
    }

    let joined = paragraphs.join("\n\n");
    Some(truncate_chars(&joined, max_chars).trim_end().to_string())
}
