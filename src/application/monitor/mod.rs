//! PBS NewsHour monitor: read the feed, keep keyword matches, draft responses.

mod feed;
mod filter;
mod scrape;
mod text;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::{sync::Mutex, time::sleep};
use tracing::{info, warn};
use uuid::Uuid;

pub use feed::{FeedItem, parse_feed};
pub use filter::KeywordMatcher;
pub use scrape::extract_article_text;

use crate::{
    application::{
        articles::{ArticleError, ArticleService, GeneratedDraft},
        generation::{ArticleGenerator, GenerationError, ResponsePrompt, RetryPolicy},
        repos::{KeywordsRepo, RepoError},
    },
    config::MonitorSettings,
    domain::categories::Category,
    infra::telemetry,
};

pub const MONITOR_AUTHOR: &str = "Peoples Thread Desk";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to `{url}` failed: {message}")]
    Transport { url: String, message: String },
    #[error("`{url}` answered with status {status}")]
    Status { url: String, status: u16 },
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("a monitor run is already in progress")]
    AlreadyRunning,
    #[error("failed to fetch feed: {0}")]
    Feed(#[source] FetchError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Article(#[from] ArticleError),
}

#[derive(Debug, Error)]
enum ItemError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Article(#[from] ArticleError),
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub feed_url: String,
    pub max_articles_per_run: usize,
    pub scrape_full_article: bool,
    pub scrape_max_chars: usize,
    pub retry: RetryPolicy,
    pub item_delay: Duration,
    pub default_category: Category,
}

impl From<&MonitorSettings> for MonitorConfig {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            feed_url: settings.feed_url.clone(),
            max_articles_per_run: settings.max_articles_per_run.get() as usize,
            scrape_full_article: settings.scrape_full_article,
            scrape_max_chars: usize::try_from(settings.scrape_max_chars.get())
                .unwrap_or(usize::MAX),
            retry: RetryPolicy::new(settings.max_retries.get(), settings.retry_delay),
            item_delay: settings.item_delay,
            default_category: settings.default_category,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorTrigger {
    Schedule,
    Manual,
}

impl MonitorTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorCandidate {
    #[serde(flatten)]
    pub item: FeedItem,
    pub matched_keywords: Vec<String>,
    pub already_processed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedItem {
    pub article_id: Uuid,
    pub slug: String,
    pub title: String,
    pub source_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorFailure {
    pub source_url: String,
    pub source_title: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub trigger: MonitorTrigger,
    pub fetched: usize,
    pub matched: usize,
    pub skipped_existing: usize,
    pub generated: Vec<GeneratedItem>,
    pub failures: Vec<MonitorFailure>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

struct Discovery {
    fetched: usize,
    candidates: Vec<MonitorCandidate>,
}

pub struct MonitorService {
    fetcher: Arc<dyn SourceFetcher>,
    keywords: Arc<dyn KeywordsRepo>,
    articles: Arc<ArticleService>,
    generator: Arc<ArticleGenerator>,
    config: MonitorConfig,
    running: Mutex<()>,
}

impl MonitorService {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        keywords: Arc<dyn KeywordsRepo>,
        articles: Arc<ArticleService>,
        generator: Arc<ArticleGenerator>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            fetcher,
            keywords,
            articles,
            generator,
            config,
            running: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Matched feed items without generating anything.
    pub async fn candidates(&self) -> Result<Vec<MonitorCandidate>, MonitorError> {
        Ok(self.discover().await?.candidates)
    }

    pub async fn run(&self, trigger: MonitorTrigger) -> Result<MonitorReport, MonitorError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| MonitorError::AlreadyRunning)?;
        let started_at = OffsetDateTime::now_utc();
        metrics::counter!(telemetry::METRIC_MONITOR_RUNS, "trigger" => trigger.as_str())
            .increment(1);

        let Discovery {
            fetched,
            candidates,
        } = self.discover().await?;
        let matched = candidates.len();
        let skipped_existing = candidates.iter().filter(|c| c.already_processed).count();

        let mut generated = Vec::new();
        let mut failures = Vec::new();
        let pending = candidates
            .into_iter()
            .filter(|candidate| !candidate.already_processed)
            .take(self.config.max_articles_per_run);

        for (index, candidate) in pending.enumerate() {
            if index > 0 && !self.config.item_delay.is_zero() {
                sleep(self.config.item_delay).await;
            }

            match self.process(&candidate).await {
                Ok(item) => {
                    info!(
                        target = "peoples_thread::application::monitor",
                        article_id = %item.article_id,
                        source_url = %item.source_url,
                        "monitor draft created"
                    );
                    generated.push(item);
                }
                Err(err) => {
                    warn!(
                        target = "peoples_thread::application::monitor",
                        source_url = %candidate.item.link,
                        error = %err,
                        "monitor item failed"
                    );
                    failures.push(MonitorFailure {
                        source_url: candidate.item.link.clone(),
                        source_title: candidate.item.title.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let report = MonitorReport {
            trigger,
            fetched,
            matched,
            skipped_existing,
            generated,
            failures,
            started_at,
            finished_at: OffsetDateTime::now_utc(),
        };
        info!(
            target = "peoples_thread::application::monitor",
            trigger = trigger.as_str(),
            fetched = report.fetched,
            matched = report.matched,
            skipped_existing = report.skipped_existing,
            generated = report.generated.len(),
            failed = report.failures.len(),
            "monitor run finished"
        );
        Ok(report)
    }

    async fn discover(&self) -> Result<Discovery, MonitorError> {
        let xml = self
            .fetcher
            .fetch(&self.config.feed_url)
            .await
            .map_err(MonitorError::Feed)?;
        let items = parse_feed(&xml);
        let fetched = items.len();

        let keywords = self.keywords.list_keywords().await?;
        let matcher = KeywordMatcher::new(keywords.iter().map(|k| k.keyword.as_str()));
        if matcher.is_empty() {
            info!(
                target = "peoples_thread::application::monitor",
                fetched, "no monitor keywords configured"
            );
            return Ok(Discovery {
                fetched,
                candidates: Vec::new(),
            });
        }

        let mut candidates = Vec::new();
        for item in items {
            let matched_keywords = matcher.match_item(&item);
            if matched_keywords.is_empty() {
                continue;
            }
            let already_processed = self.articles.source_exists(&item.link).await?;
            candidates.push(MonitorCandidate {
                item,
                matched_keywords,
                already_processed,
            });
        }

        Ok(Discovery {
            fetched,
            candidates,
        })
    }

    async fn process(&self, candidate: &MonitorCandidate) -> Result<GeneratedItem, ItemError> {
        let item = &candidate.item;
        let source_body = if self.config.scrape_full_article {
            self.scrape(&item.link).await
        } else {
            None
        };

        let category = infer_category(&item.link).unwrap_or(self.config.default_category);
        let prompt = ResponsePrompt {
            source_title: &item.title,
            source_url: &item.link,
            summary: &item.description,
            source_body: source_body.as_deref(),
            keywords: &candidate.matched_keywords,
            category,
        }
        .render();

        let article = self
            .generator
            .generate_with_retry(&prompt, category, self.config.retry)
            .await?;
        let record = self
            .articles
            .create_generated(GeneratedDraft {
                article,
                author: MONITOR_AUTHOR.to_string(),
                publish: false,
                source_url: Some(item.link.clone()),
                source_title: Some(item.title.clone()),
            })
            .await?;

        Ok(GeneratedItem {
            article_id: record.id,
            slug: record.slug,
            title: record.title,
            source_url: item.link.clone(),
        })
    }

    /// Source page text, or `None` so the prompt falls back to the feed summary.
    async fn scrape(&self, url: &str) -> Option<String> {
        match self.fetcher.fetch(url).await {
            Ok(html) => {
                let text = extract_article_text(&html, self.config.scrape_max_chars);
                if text.is_none() {
                    warn!(
                        target = "peoples_thread::application::monitor",
                        url, "source page had no paragraph text"
                    );
                }
                text
            }
            Err(err) => {
                warn!(
                    target = "peoples_thread::application::monitor",
                    url,
                    error = %err,
                    "source scrape failed, using feed summary"
                );
                None
            }
        }
    }
}

/// Category named by a path segment of the story URL, e.g. `/newshour/economy/...`.
fn infer_category(link: &str) -> Option<Category> {
    let url = url::Url::parse(link).ok()?;
    let segments = url.path_segments()?;
    for segment in segments {
        if let Some(category) = Category::all()
            .iter()
            .copied()
            .find(|category| category.slug() == segment)
        {
            return Some(category);
        }
    }
    None
}
