//! Utilities for generating deterministic, URL-safe article slugs.
//!
//! Slugification is delegated to the `slug` crate. Callers provide their own
//! uniqueness predicate so the generation logic stays free of persistence.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;
const MAX_SLUG_LEN: usize = 96;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

/// Errors that can occur while generating a slug via an async uniqueness check.
#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from a headline.
///
/// Long headlines are cut on a hyphen boundary so slugs stay readable.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    if candidate.len() <= MAX_SLUG_LEN {
        return Ok(candidate);
    }

    let cut = candidate[..MAX_SLUG_LEN]
        .rfind('-')
        .unwrap_or(MAX_SLUG_LEN);
    Ok(candidate[..cut].trim_end_matches('-').to_string())
}

/// Whether `value` already is a canonical slug (lowercase ASCII, digits, single hyphens).
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SLUG_LEN + 4
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

/// Produce a slug that does not collide according to the supplied async predicate.
///
/// The predicate returns `true` when the candidate is free. Collisions retry
/// with a monotonic suffix (`-2`, `-3`, …).
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_normalises_headline() {
        let slug = derive_slug("Workers Strike at Port of L.A.!").expect("slug");
        assert_eq!(slug, "workers-strike-at-port-of-l-a");
    }

    #[test]
    fn derive_slug_rejects_blank_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn long_headlines_are_cut_on_word_boundary() {
        let headline = "word ".repeat(60);
        let slug = derive_slug(&headline).expect("slug");
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert!(slug.ends_with("word"));
    }

    #[test]
    fn validates_canonical_slugs() {
        assert!(is_valid_slug("senate-votes-2"));
        assert!(!is_valid_slug("Senate-votes"));
        assert!(!is_valid_slug("double--dash"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug(""));
    }

    #[tokio::test]
    async fn generate_unique_slug_async_appends_counter() {
        use std::sync::Arc;
        use tokio::sync::Mutex;

        let existing = Arc::new(Mutex::new(vec!["union-drive".to_string()]));

        let slug = generate_unique_slug_async("Union Drive", |candidate| {
            let existing = existing.clone();
            let candidate = candidate.to_string();
            async move {
                let mut guard = existing.lock().await;
                if guard.contains(&candidate) {
                    Ok::<bool, std::convert::Infallible>(false)
                } else {
                    guard.push(candidate);
                    Ok::<bool, std::convert::Infallible>(true)
                }
            }
        })
        .await
        .expect("unique slug");

        assert_eq!(slug, "union-drive-2");
    }

    #[tokio::test]
    async fn generate_unique_slug_async_exhausts() {
        let result = generate_unique_slug_async("Example", |_| async {
            Ok::<bool, std::convert::Infallible>(false)
        })
        .await;
        assert!(matches!(
            result,
            Err(SlugAsyncError::Slug(SlugError::Exhausted { .. }))
        ));
    }
}
