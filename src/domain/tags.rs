//! Tag normalisation shared by editors and AI drafts.

pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LEN: usize = 40;

/// Trim, lowercase, drop blanks and duplicates, keep the first [`MAX_TAGS`].
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag
            .as_ref()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if tag.is_empty() || tag.chars().count() > MAX_TAG_LEN {
            continue;
        }
        if normalized.contains(&tag) {
            continue;
        }
        normalized.push(tag);
        if normalized.len() == MAX_TAGS {
            break;
        }
    }
    normalized
}
