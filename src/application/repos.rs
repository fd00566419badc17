//! Repository traits describing persistence adapters.
//!
//! Both the Postgres adapter and the JSON file store implement every trait so
//! services never know which backend is active.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::categories::Category;
use crate::domain::entities::{
    ArticleRecord, KeywordRecord, ScheduledPostRecord, SubscriberRecord, UserRecord,
};
use crate::domain::types::{ArticleStatus, Recurrence, Role, ScheduleStatus};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::Duplicate {
            constraint: constraint.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArticleQueryFilter {
    pub status: Option<ArticleStatus>,
    pub category: Option<Category>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub breaking: Option<bool>,
    pub ai_generated: Option<bool>,
}

impl ArticleQueryFilter {
    pub fn published() -> Self {
        Self {
            status: Some(ArticleStatus::Published),
            ..Self::default()
        }
    }

    /// In-memory evaluation of the filter, shared by the file store and tests.
    pub fn matches(&self, article: &ArticleRecord) -> bool {
        if self.status.is_some_and(|status| article.status != status) {
            return false;
        }
        if self.category.is_some_and(|category| article.category != category) {
            return false;
        }
        if let Some(tag) = self.tag.as_deref() {
            if !article.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        if self.featured.is_some_and(|flag| article.featured != flag) {
            return false;
        }
        if self.breaking.is_some_and(|flag| article.breaking != flag) {
            return false;
        }
        if self.ai_generated.is_some_and(|flag| article.ai_generated != flag) {
            return false;
        }
        if let Some(search) = self.search.as_deref() {
            let needle = search.to_lowercase();
            let hit = article.title.to_lowercase().contains(&needle)
                || article.excerpt.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct CreateArticleParams {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub author: String,
    pub status: ArticleStatus,
    pub featured: bool,
    pub breaking: bool,
    pub ai_generated: bool,
    pub source_url: Option<String>,
    pub source_title: Option<String>,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct UpdateArticleParams {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub author: String,
    pub featured: bool,
    pub breaking: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryCount {
    pub category: Category,
    pub name: &'static str,
    pub articles: u64,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TopArticle {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub view_count: i64,
}

/// Aggregates used by the analytics view.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct ArticleStats {
    pub drafts: u64,
    pub published: u64,
    pub archived: u64,
    pub ai_generated: u64,
    pub total_views: i64,
    pub top_articles: Vec<TopArticle>,
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    async fn list_articles(
        &self,
        filter: &ArticleQueryFilter,
        page: PageRequest,
    ) -> Result<Page<ArticleRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError>;

    async fn find_by_source_url(&self, url: &str) -> Result<Option<ArticleRecord>, RepoError>;

    async fn create_article(&self, params: CreateArticleParams)
    -> Result<ArticleRecord, RepoError>;

    async fn update_article(&self, params: UpdateArticleParams)
    -> Result<ArticleRecord, RepoError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: ArticleStatus,
        published_at: Option<OffsetDateTime>,
    ) -> Result<ArticleRecord, RepoError>;

    async fn delete_article(&self, id: Uuid) -> Result<(), RepoError>;

    /// Increment the view counter of a published article, returning the new count.
    async fn increment_views(&self, slug: &str) -> Result<Option<i64>, RepoError>;

    /// Published article counts and views per category, every category included.
    async fn category_counts(&self) -> Result<Vec<CategoryCount>, RepoError>;

    /// Tag usage across published articles, most used first.
    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepoError>;

    async fn article_stats(&self, top: u32) -> Result<ArticleStats, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepoError>;

    async fn count_users(&self) -> Result<u64, RepoError>;

    /// Case-insensitive lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SubscribersRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<SubscriberRecord>, RepoError>;

    async fn create_subscriber(&self, email: &str) -> Result<SubscriberRecord, RepoError>;

    async fn set_active(
        &self,
        id: Uuid,
        active: bool,
        at: OffsetDateTime,
    ) -> Result<SubscriberRecord, RepoError>;

    async fn list_subscribers(&self, active_only: bool)
    -> Result<Vec<SubscriberRecord>, RepoError>;

    async fn count_active(&self) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateScheduledPostParams {
    pub topic: String,
    pub category: Category,
    pub instructions: Option<String>,
    pub run_at: OffsetDateTime,
    pub recurrence: Recurrence,
    pub anchor_day: u8,
    pub auto_publish: bool,
    pub created_by: String,
}

impl CreateScheduledPostParams {
    /// Follow-up occurrence for a recurring post.
    pub fn follow_up(record: &ScheduledPostRecord, run_at: OffsetDateTime) -> Self {
        Self {
            topic: record.topic.clone(),
            category: record.category,
            instructions: record.instructions.clone(),
            run_at,
            recurrence: record.recurrence,
            anchor_day: record.anchor_day,
            auto_publish: record.auto_publish,
            created_by: record.created_by.clone(),
        }
    }
}

#[async_trait]
pub trait ScheduledPostsRepo: Send + Sync {
    async fn create_scheduled(
        &self,
        params: CreateScheduledPostParams,
    ) -> Result<ScheduledPostRecord, RepoError>;

    async fn find_scheduled(&self, id: Uuid) -> Result<Option<ScheduledPostRecord>, RepoError>;

    async fn list_scheduled(
        &self,
        status: Option<ScheduleStatus>,
    ) -> Result<Vec<ScheduledPostRecord>, RepoError>;

    /// Atomically move up to `limit` due pending rows to `running` and return them.
    /// `running` rows last touched before `stale_before` are claimed again.
    async fn claim_due(
        &self,
        now: OffsetDateTime,
        stale_before: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<ScheduledPostRecord>, RepoError>;

    async fn mark_completed(
        &self,
        id: Uuid,
        article_id: Uuid,
    ) -> Result<ScheduledPostRecord, RepoError>;

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<ScheduledPostRecord, RepoError>;

    /// Cancel a pending row. Returns `None` when the row exists but is no longer pending.
    async fn cancel_scheduled(&self, id: Uuid)
    -> Result<Option<ScheduledPostRecord>, RepoError>;
}

#[async_trait]
pub trait KeywordsRepo: Send + Sync {
    async fn list_keywords(&self) -> Result<Vec<KeywordRecord>, RepoError>;

    async fn add_keyword(&self, keyword: &str) -> Result<KeywordRecord, RepoError>;

    async fn remove_keyword(&self, id: Uuid) -> Result<(), RepoError>;

    async fn replace_keywords(&self, keywords: &[String])
    -> Result<Vec<KeywordRecord>, RepoError>;
}
