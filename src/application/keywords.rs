//! Editor-maintained keyword list driving the PBS monitor.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::repos::{KeywordsRepo, RepoError},
    domain::{entities::KeywordRecord, error::DomainError},
};

pub const KEYWORD_MIN_CHARS: usize = 2;
pub const KEYWORD_MAX_CHARS: usize = 64;

#[derive(Debug, Error)]
pub enum KeywordError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("keyword `{0}` already exists")]
    Duplicate(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct KeywordService {
    repo: Arc<dyn KeywordsRepo>,
}

impl KeywordService {
    pub fn new(repo: Arc<dyn KeywordsRepo>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<KeywordRecord>, KeywordError> {
        Ok(self.repo.list_keywords().await?)
    }

    pub async fn add(&self, keyword: &str) -> Result<KeywordRecord, KeywordError> {
        let keyword = normalize_keyword(keyword)?;
        let record = self.repo.add_keyword(&keyword).await.map_err(|err| match err {
            RepoError::Duplicate { .. } => KeywordError::Duplicate(keyword.clone()),
            other => other.into(),
        })?;
        info!(
            target = "peoples_thread::application::keywords",
            keyword = %record.keyword,
            "monitor keyword added"
        );
        Ok(record)
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), KeywordError> {
        self.repo.remove_keyword(id).await.map_err(|err| match err {
            RepoError::NotFound => DomainError::not_found("keyword").into(),
            other => other.into(),
        })
    }

    /// Replace the whole list; duplicates in the input collapse to one entry.
    pub async fn replace_all(&self, keywords: &[String]) -> Result<Vec<KeywordRecord>, KeywordError> {
        let mut normalized: Vec<String> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let keyword = normalize_keyword(keyword)?;
            if !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }

        let records = self.repo.replace_keywords(&normalized).await?;
        info!(
            target = "peoples_thread::application::keywords",
            count = records.len(),
            "monitor keywords replaced"
        );
        Ok(records)
    }
}

pub fn normalize_keyword(keyword: &str) -> Result<String, DomainError> {
    let keyword = keyword
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let len = keyword.chars().count();
    if !(KEYWORD_MIN_CHARS..=KEYWORD_MAX_CHARS).contains(&len) {
        return Err(DomainError::validation(
            "keyword",
            format!(
                "keyword must be between {KEYWORD_MIN_CHARS} and {KEYWORD_MAX_CHARS} characters"
            ),
        ));
    }
    Ok(keyword)
}
