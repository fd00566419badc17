use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::{auth::AuthPrincipal, pagination::PageRequest, repos::ArticleQueryFilter};
use crate::domain::{categories::Category, error::DomainError, types::ArticleStatus, types::Role};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: AuthPrincipal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticleListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub breaking: Option<bool>,
    pub ai_generated: Option<bool>,
}

impl ArticleListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    /// Filter from query parameters; blank values are ignored.
    pub fn filter(&self) -> Result<ArticleQueryFilter, DomainError> {
        let status = match non_blank(self.status.as_deref()) {
            Some(status) => Some(status.parse::<ArticleStatus>()?),
            None => None,
        };
        let category = match non_blank(self.category.as_deref()) {
            Some(category) => Some(category.parse::<Category>()?),
            None => None,
        };
        Ok(ArticleQueryFilter {
            status,
            category,
            tag: non_blank(self.tag.as_deref()).map(str::to_lowercase),
            search: non_blank(self.search.as_deref()).map(str::to_string),
            featured: self.featured,
            breaking: self.breaking,
            ai_generated: self.ai_generated,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub slug: String,
    pub view_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ArticleStatus,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
    pub category: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScheduledListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KeywordRequest {
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
pub struct KeywordsReplaceRequest {
    pub keywords: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscribersQuery {
    pub active_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: crate::infra::store::StorageKind,
}
