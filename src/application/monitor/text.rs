//! Markup clean-up shared by the RSS reader and the page scraper.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));
static CDATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("cdata pattern"));
static NUMERIC_ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("entity pattern"));

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&#39;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&nbsp;", " "),
    ("&ndash;", "\u{2013}"),
    ("&mdash;", "\u{2014}"),
    ("&lsquo;", "\u{2018}"),
    ("&rsquo;", "\u{2019}"),
    ("&ldquo;", "\u{201C}"),
    ("&rdquo;", "\u{201D}"),
    ("&hellip;", "\u{2026}"),
];

/// Replace `<![CDATA[...]]>` sections with their raw contents.
pub fn unwrap_cdata(input: &str) -> String {
    CDATA_RE.replace_all(input, "$1").into_owned()
}

/// Decode the common named entities and numeric character references.
///
/// `&amp;` is decoded last so `&amp;lt;` yields the literal text `&lt;`.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = NUMERIC_ENTITY_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let raw = &caps[1];
            let code = match raw.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => raw.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();
    for (entity, replacement) in NAMED_ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    out.replace("&amp;", "&")
}

pub fn strip_tags(input: &str) -> String {
    TAG_RE.replace_all(input, " ").into_owned()
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Markup fragment to plain text: CDATA unwrapped, tags stripped, entities decoded.
pub fn to_plain_text(fragment: &str) -> String {
    let unwrapped = unwrap_cdata(fragment);
    // Feeds often escape their HTML, so decode before stripping and once more after.
    let decoded = decode_entities(&unwrapped);
    collapse_whitespace(&decode_entities(&strip_tags(&decoded)))
}

/// Cut `input` to at most `max_chars` characters.
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}
