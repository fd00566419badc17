use std::str::FromStr;

use serde::Deserialize;

use crate::domain::{categories::Category, tags::normalize_tags};

use super::{GeneratedArticle, GenerationError};

pub const EXCERPT_MAX_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct RawGenerated {
    #[serde(default, alias = "headline")]
    title: Option<String>,
    #[serde(default, alias = "content")]
    body: Option<String>,
    #[serde(default, alias = "summary")]
    excerpt: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    category: Option<String>,
}

/// Extract an article from a completion.
///
/// Accepts a bare JSON object, a fenced code block, or prose wrapped around a
/// single object.
pub fn parse_generated(text: &str, fallback: Category) -> Result<GeneratedArticle, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::Empty);
    }

    let raw = candidates(trimmed)
        .into_iter()
        .find_map(|candidate| serde_json::from_str::<RawGenerated>(candidate).ok())
        .ok_or_else(|| GenerationError::parse("no JSON object found in completion"))?;

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GenerationError::parse("missing `title`"))?;
    let body = raw
        .body
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| GenerationError::parse("missing `body`"))?;

    let excerpt = raw
        .excerpt
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| derive_excerpt(&body));

    let category = raw
        .category
        .as_deref()
        .and_then(|value| Category::from_str(value).ok())
        .unwrap_or(fallback);

    Ok(GeneratedArticle {
        title,
        excerpt,
        body,
        tags: normalize_tags(raw.tags.unwrap_or_default()),
        category,
    })
}

fn candidates(text: &str) -> Vec<&str> {
    let mut out = vec![text];

    if let Some(fenced) = fenced_block(text) {
        out.push(fenced);
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            out.push(&text[start..=end]);
        }
    }

    out
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// First [`EXCERPT_MAX_CHARS`] characters of the body, cut on a word boundary.
pub fn derive_excerpt(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= EXCERPT_MAX_CHARS {
        return collapsed;
    }

    let cut: String = collapsed.chars().take(EXCERPT_MAX_CHARS).collect();
    let shortened = match cut.rfind(' ') {
        Some(index) if index > 0 => &cut[..index],
        _ => cut.as_str(),
    };
    format!(
        "{}…",
        shortened.trim_end_matches(|c: char| c.is_ascii_punctuation())
    )
}
