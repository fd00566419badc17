use std::sync::Arc;

use serde::Serialize;

use crate::application::repos::{
    ArticleStats, ArticlesRepo, CategoryCount, RepoError, SubscribersRepo,
};

const TOP_ARTICLES: u32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    #[serde(flatten)]
    pub articles: ArticleStats,
    pub total_articles: u64,
    pub categories: Vec<CategoryCount>,
    pub subscribers: u64,
}

pub struct AnalyticsService {
    articles: Arc<dyn ArticlesRepo>,
    subscribers: Arc<dyn SubscribersRepo>,
}

impl AnalyticsService {
    pub fn new(articles: Arc<dyn ArticlesRepo>, subscribers: Arc<dyn SubscribersRepo>) -> Self {
        Self {
            articles,
            subscribers,
        }
    }

    pub async fn summary(&self) -> Result<AnalyticsSummary, RepoError> {
        let articles = self.articles.article_stats(TOP_ARTICLES).await?;
        let categories = self.articles.category_counts().await?;
        let subscribers = self.subscribers.count_active().await?;

        Ok(AnalyticsSummary {
            total_articles: articles.drafts + articles.published + articles.archived,
            articles,
            categories,
            subscribers,
        })
    }
}
