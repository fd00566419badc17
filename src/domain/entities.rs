//! Domain entities mirrored from persistent storage.
//!
//! Records serialize with RFC 3339 timestamps so the same shape is used by the
//! JSON file store and the HTTP API.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{
    categories::Category,
    types::{ArticleStatus, Recurrence, Role, ScheduleStatus},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: Uuid,
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
    pub view_count: i64,
    pub ai_generated: bool,
    pub source_url: Option<String>,
    pub source_title: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ArticleRecord {
    pub fn is_public(&self) -> bool {
        self.status == ArticleStatus::Published
    }

    /// Time used for ordering listings: publication first, creation otherwise.
    pub fn primary_time(&self) -> OffsetDateTime {
        self.published_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberRecord {
    pub id: Uuid,
    pub email: String,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub unsubscribed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPostRecord {
    pub id: Uuid,
    pub topic: String,
    pub category: Category,
    pub instructions: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub run_at: OffsetDateTime,
    pub recurrence: Recurrence,
    /// Day of month monthly follow-ups aim for.
    pub anchor_day: u8,
    pub auto_publish: bool,
    pub status: ScheduleStatus,
    pub article_id: Option<Uuid>,
    pub last_error: Option<String>,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRecord {
    pub id: Uuid,
    pub keyword: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
