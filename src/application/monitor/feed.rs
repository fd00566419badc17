//! Minimal RSS 2.0 item reader.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc2822};

use super::text::{collapse_whitespace, decode_entities, to_plain_text, unwrap_cdata};

static ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<item(?:\s[^>]*)?>(.*?)</item>").expect("item pattern"));

fn field_regex(name: &str) -> Regex {
    Regex::new(&format!(r"(?is)<{name}(?:\s[^>]*)?>(.*?)</{name}>")).expect("field pattern")
}

static TITLE_RE: Lazy<Regex> = Lazy::new(|| field_regex("title"));
static LINK_RE: Lazy<Regex> = Lazy::new(|| field_regex("link"));
static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| field_regex("description"));
static PUB_DATE_RE: Lazy<Regex> = Lazy::new(|| field_regex("pubDate"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

/// Extract every `<item>` with a title and link, in feed order.
pub fn parse_feed(xml: &str) -> Vec<FeedItem> {
    ITEM_RE
        .captures_iter(xml)
        .filter_map(|caps| parse_item(&caps[1]))
        .collect()
}

fn parse_item(block: &str) -> Option<FeedItem> {
    let title = field(&TITLE_RE, block).map(|raw| to_plain_text(&raw))?;
    let link = field(&LINK_RE, block)
        .map(|raw| collapse_whitespace(&decode_entities(&unwrap_cdata(&raw))))?;
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let description = field(&DESCRIPTION_RE, block)
        .map(|raw| to_plain_text(&raw))
        .unwrap_or_default();
    let published_at = field(&PUB_DATE_RE, block)
        .and_then(|raw| OffsetDateTime::parse(collapse_whitespace(&raw).as_str(), &Rfc2822).ok());

    Some(FeedItem {
        title,
        link,
        description,
        published_at,
    })
}

fn field(re: &Regex, block: &str) -> Option<String> {
    re.captures(block).map(|caps| caps[1].to_string())
}
