//! Article authoring, publishing and read-side queries.

use std::{str::FromStr, sync::Arc};

use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{
        generation::{GeneratedArticle, derive_excerpt},
        pagination::{Page, PageRequest},
        repos::{
            ArticleQueryFilter, ArticlesRepo, CategoryCount, CreateArticleParams, RepoError,
            TagCount, UpdateArticleParams,
        },
    },
    domain::{
        categories::Category,
        entities::ArticleRecord,
        error::DomainError,
        slug::{SlugAsyncError, generate_unique_slug_async, is_valid_slug},
        tags::normalize_tags,
        types::ArticleStatus,
    },
    infra::telemetry,
};

pub const TITLE_MAX_CHARS: usize = 200;
pub const EXCERPT_MAX_CHARS: usize = 500;
pub const AUTHOR_MAX_CHARS: usize = 120;

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("an article with this {field} already exists")]
    Conflict { field: &'static str },
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for ArticleError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::Domain(DomainError::not_found("article")),
            RepoError::Duplicate { constraint } if constraint.contains("source_url") => {
                Self::Conflict { field: "source_url" }
            }
            RepoError::Duplicate { .. } => Self::Conflict { field: "slug" },
            other => Self::Repo(other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateArticleCommand {
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub body: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub breaking: bool,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateArticleCommand {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub author: Option<String>,
    pub featured: Option<bool>,
    pub breaking: Option<bool>,
}

/// An AI draft ready to be persisted.
#[derive(Debug, Clone)]
pub struct GeneratedDraft {
    pub article: GeneratedArticle,
    pub author: String,
    pub publish: bool,
    pub source_url: Option<String>,
    pub source_title: Option<String>,
}

pub struct ArticleService {
    repo: Arc<dyn ArticlesRepo>,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticlesRepo>) -> Self {
        Self { repo }
    }

    pub async fn list_public(
        &self,
        filter: ArticleQueryFilter,
        page: PageRequest,
    ) -> Result<Page<ArticleRecord>, ArticleError> {
        let filter = ArticleQueryFilter {
            status: Some(ArticleStatus::Published),
            ..filter
        };
        Ok(self.repo.list_articles(&filter, page).await?)
    }

    pub async fn list_admin(
        &self,
        filter: ArticleQueryFilter,
        page: PageRequest,
    ) -> Result<Page<ArticleRecord>, ArticleError> {
        Ok(self.repo.list_articles(&filter, page).await?)
    }

    pub async fn find_public_by_slug(&self, slug: &str) -> Result<ArticleRecord, ArticleError> {
        self.repo
            .find_by_slug(slug)
            .await?
            .filter(ArticleRecord::is_public)
            .ok_or_else(|| DomainError::not_found("article").into())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<ArticleRecord, ArticleError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("article").into())
    }

    /// Latest published articles in the same category, excluding `article`.
    pub async fn related(
        &self,
        article: &ArticleRecord,
        limit: u32,
    ) -> Result<Vec<ArticleRecord>, ArticleError> {
        let filter = ArticleQueryFilter {
            category: Some(article.category),
            ..ArticleQueryFilter::published()
        };
        let page = self
            .repo
            .list_articles(&filter, PageRequest::first(limit.saturating_add(1)))
            .await?;
        Ok(page
            .items
            .into_iter()
            .filter(|candidate| candidate.id != article.id)
            .take(limit as usize)
            .collect())
    }

    pub async fn create(
        &self,
        actor: &str,
        command: CreateArticleCommand,
    ) -> Result<ArticleRecord, ArticleError> {
        let title = validate_title(&command.title)?;
        let body = validate_body(&command.body)?;
        let category = parse_category(&command.category)?;
        let excerpt = resolve_excerpt(command.excerpt.as_deref(), &body)?;
        let author = resolve_author(command.author.as_deref(), actor)?;
        let status = command.status.unwrap_or(ArticleStatus::Draft);
        let slug = self.unique_slug(&title, None).await?;

        let params = CreateArticleParams {
            slug,
            title,
            excerpt,
            body,
            category,
            tags: normalize_tags(&command.tags),
            author,
            status,
            featured: command.featured,
            breaking: command.breaking,
            ai_generated: false,
            source_url: None,
            source_title: None,
            published_at: (status == ArticleStatus::Published).then(OffsetDateTime::now_utc),
        };

        let article = self.repo.create_article(params).await?;
        info!(
            target = "peoples_thread::application::articles",
            article_id = %article.id,
            slug = %article.slug,
            status = %article.status,
            actor,
            "article created"
        );
        Ok(article)
    }

    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        command: UpdateArticleCommand,
    ) -> Result<ArticleRecord, ArticleError> {
        let current = self.find_by_id(id).await?;

        let title = match command.title.as_deref() {
            Some(title) => validate_title(title)?,
            None => current.title.clone(),
        };
        let body = match command.body.as_deref() {
            Some(body) => validate_body(body)?,
            None => current.body.clone(),
        };
        let category = match command.category.as_deref() {
            Some(category) => parse_category(category)?,
            None => current.category,
        };
        let excerpt = match command.excerpt.as_deref() {
            Some(excerpt) => resolve_excerpt(Some(excerpt), &body)?,
            None => current.excerpt.clone(),
        };
        let author = match command.author.as_deref() {
            Some(author) => resolve_author(Some(author), &current.author)?,
            None => current.author.clone(),
        };
        let slug = match command.slug.as_deref().map(str::trim) {
            Some(slug) if slug != current.slug => self.explicit_slug(slug, id).await?,
            _ => current.slug.clone(),
        };

        let params = UpdateArticleParams {
            id,
            slug,
            title,
            excerpt,
            body,
            category,
            tags: command
                .tags
                .as_ref()
                .map(normalize_tags)
                .unwrap_or_else(|| current.tags.clone()),
            author,
            featured: command.featured.unwrap_or(current.featured),
            breaking: command.breaking.unwrap_or(current.breaking),
        };

        let article = self.repo.update_article(params).await?;
        info!(
            target = "peoples_thread::application::articles",
            article_id = %article.id,
            slug = %article.slug,
            actor,
            "article updated"
        );
        Ok(article)
    }

    /// Publishing stamps `published_at` once; later transitions keep it.
    pub async fn set_status(
        &self,
        actor: &str,
        id: Uuid,
        status: ArticleStatus,
    ) -> Result<ArticleRecord, ArticleError> {
        let current = self.find_by_id(id).await?;
        let published_at = match status {
            ArticleStatus::Published => current.published_at.or(Some(OffsetDateTime::now_utc())),
            ArticleStatus::Draft | ArticleStatus::Archived => current.published_at,
        };

        let article = self.repo.update_status(id, status, published_at).await?;
        info!(
            target = "peoples_thread::application::articles",
            article_id = %article.id,
            from = %current.status,
            to = %article.status,
            actor,
            "article status changed"
        );
        Ok(article)
    }

    pub async fn delete(&self, actor: &str, id: Uuid) -> Result<(), ArticleError> {
        self.repo.delete_article(id).await?;
        info!(
            target = "peoples_thread::application::articles",
            article_id = %id,
            actor,
            "article deleted"
        );
        Ok(())
    }

    pub async fn record_view(&self, slug: &str) -> Result<i64, ArticleError> {
        let count = self
            .repo
            .increment_views(slug)
            .await?
            .ok_or_else(|| ArticleError::from(DomainError::not_found("article")))?;
        metrics::counter!(telemetry::METRIC_ARTICLE_VIEWS).increment(1);
        Ok(count)
    }

    pub async fn category_counts(&self) -> Result<Vec<CategoryCount>, ArticleError> {
        Ok(self.repo.category_counts().await?)
    }

    pub async fn tag_counts(&self) -> Result<Vec<TagCount>, ArticleError> {
        Ok(self.repo.tag_counts().await?)
    }

    pub async fn source_exists(&self, url: &str) -> Result<bool, ArticleError> {
        Ok(self.repo.find_by_source_url(url).await?.is_some())
    }

    /// Persist an AI draft.
    pub async fn create_generated(
        &self,
        draft: GeneratedDraft,
    ) -> Result<ArticleRecord, ArticleError> {
        let GeneratedDraft {
            article,
            author,
            publish,
            source_url,
            source_title,
        } = draft;

        let title: String = article.title.chars().take(TITLE_MAX_CHARS).collect();
        let slug = self.unique_slug(&title, None).await?;
        let status = if publish {
            ArticleStatus::Published
        } else {
            ArticleStatus::Draft
        };

        let params = CreateArticleParams {
            slug,
            title,
            excerpt: article.excerpt.chars().take(EXCERPT_MAX_CHARS).collect(),
            body: article.body,
            category: article.category,
            tags: article.tags,
            author,
            status,
            featured: false,
            breaking: false,
            ai_generated: true,
            source_url,
            source_title,
            published_at: publish.then(OffsetDateTime::now_utc),
        };

        let record = self.repo.create_article(params).await?;
        metrics::counter!(
            telemetry::METRIC_ARTICLES_GENERATED,
            "origin" => if record.source_url.is_some() { "monitor" } else { "topic" }
        )
        .increment(1);
        info!(
            target = "peoples_thread::application::articles",
            article_id = %record.id,
            slug = %record.slug,
            status = %record.status,
            "generated article stored"
        );
        Ok(record)
    }

    async fn unique_slug(&self, source: &str, current: Option<Uuid>) -> Result<String, ArticleError> {
        let repo = self.repo.clone();
        generate_unique_slug_async(source, |candidate| {
            let repo = repo.clone();
            let candidate = candidate.to_string();
            async move {
                let existing = repo.find_by_slug(&candidate).await?;
                Ok::<bool, RepoError>(existing.is_none_or(|article| Some(article.id) == current))
            }
        })
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(err) => DomainError::validation("title", err.to_string()).into(),
            SlugAsyncError::Predicate(err) => err.into(),
        })
    }

    async fn explicit_slug(&self, slug: &str, id: Uuid) -> Result<String, ArticleError> {
        if !is_valid_slug(slug) {
            return Err(DomainError::validation(
                "slug",
                "use lowercase letters, digits and single hyphens",
            )
            .into());
        }
        match self.repo.find_by_slug(slug).await? {
            Some(existing) if existing.id != id => Err(ArticleError::Conflict { field: "slug" }),
            _ => Ok(slug.to_string()),
        }
    }
}

fn validate_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title", "title is required"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("title must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(title.to_string())
}

fn validate_body(body: &str) -> Result<String, DomainError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(DomainError::validation("body", "body is required"));
    }
    Ok(body.to_string())
}

fn parse_category(value: &str) -> Result<Category, DomainError> {
    Category::from_str(value)
}

fn resolve_excerpt(excerpt: Option<&str>, body: &str) -> Result<String, DomainError> {
    match excerpt.map(str::trim).filter(|e| !e.is_empty()) {
        Some(excerpt) if excerpt.chars().count() > EXCERPT_MAX_CHARS => Err(
            DomainError::validation(
                "excerpt",
                format!("excerpt must be at most {EXCERPT_MAX_CHARS} characters"),
            ),
        ),
        Some(excerpt) => Ok(excerpt.to_string()),
        None => Ok(derive_excerpt(body)),
    }
}

fn resolve_author(author: Option<&str>, fallback: &str) -> Result<String, DomainError> {
    let author = author
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(fallback);
    if author.chars().count() > AUTHOR_MAX_CHARS {
        return Err(DomainError::validation(
            "author",
            format!("author must be at most {AUTHOR_MAX_CHARS} characters"),
        ));
    }
    Ok(author.to_string())
}
