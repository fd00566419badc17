use askama::Template;

use crate::application::analytics::AnalyticsSummary;
use crate::domain::entities::{ArticleRecord, KeywordRecord, ScheduledPostRecord};
use crate::presentation::views::display_date;

#[derive(Clone)]
pub struct AdminLayout<T> {
    pub title: String,
    pub username: Option<String>,
    pub asset_version: String,
    pub content: T,
}

impl<T> AdminLayout<T> {
    pub fn new(title: &str, username: Option<String>, content: T) -> Self {
        Self {
            title: format!("{title} | Peoples Thread Admin"),
            username,
            asset_version: asset_version(),
            content,
        }
    }
}

fn asset_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[derive(Clone, Default)]
pub struct AdminLoginView {
    pub username: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub view: AdminLayout<AdminLoginView>,
}

#[derive(Clone)]
pub struct AdminMetricView {
    pub label: &'static str,
    pub value: String,
}

#[derive(Clone)]
pub struct AdminDraftRow {
    pub id: String,
    pub title: String,
    pub category: &'static str,
    pub author: String,
    pub created: String,
    pub ai_generated: bool,
    pub source_url: Option<String>,
}

impl From<&ArticleRecord> for AdminDraftRow {
    fn from(article: &ArticleRecord) -> Self {
        Self {
            id: article.id.to_string(),
            title: article.title.clone(),
            category: article.category.display_name(),
            author: article.author.clone(),
            created: display_date(article.created_at),
            ai_generated: article.ai_generated,
            source_url: article.source_url.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AdminScheduledRow {
    pub topic: String,
    pub category: &'static str,
    pub run_at: String,
    pub recurrence: &'static str,
    pub auto_publish: bool,
}

impl From<&ScheduledPostRecord> for AdminScheduledRow {
    fn from(record: &ScheduledPostRecord) -> Self {
        Self {
            topic: record.topic.clone(),
            category: record.category.display_name(),
            run_at: record
                .run_at
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            recurrence: record.recurrence.as_str(),
            auto_publish: record.auto_publish,
        }
    }
}

#[derive(Clone)]
pub struct AdminDashboardView {
    pub metrics: Vec<AdminMetricView>,
    pub drafts: Vec<AdminDraftRow>,
    pub scheduled: Vec<AdminScheduledRow>,
    pub keywords: Vec<String>,
}

impl AdminDashboardView {
    pub fn new(
        summary: &AnalyticsSummary,
        drafts: &[ArticleRecord],
        scheduled: &[ScheduledPostRecord],
        keywords: &[KeywordRecord],
    ) -> Self {
        let stats = &summary.articles;
        let metrics = vec![
            AdminMetricView {
                label: "Published",
                value: stats.published.to_string(),
            },
            AdminMetricView {
                label: "Drafts",
                value: stats.drafts.to_string(),
            },
            AdminMetricView {
                label: "AI generated",
                value: stats.ai_generated.to_string(),
            },
            AdminMetricView {
                label: "Total views",
                value: stats.total_views.to_string(),
            },
            AdminMetricView {
                label: "Subscribers",
                value: summary.subscribers.to_string(),
            },
        ];

        Self {
            metrics,
            drafts: drafts.iter().map(AdminDraftRow::from).collect(),
            scheduled: scheduled.iter().map(AdminScheduledRow::from).collect(),
            keywords: keywords.iter().map(|k| k.keyword.clone()).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub view: AdminLayout<AdminDashboardView>,
}
