//! Service wiring shared by the server, the CLI commands and integration tests.

use std::sync::Arc;

use crate::{
    application::{
        analytics::AnalyticsService,
        articles::ArticleService,
        auth::AuthService,
        generation::{ArticleGenerator, CompletionClient, RetryPolicy},
        keywords::KeywordService,
        monitor::{MonitorConfig, MonitorService, SourceFetcher},
        newsletter::NewsletterService,
        scheduler::SchedulerService,
    },
    config::Settings,
    infra::store::Repositories,
};

#[derive(Clone)]
pub struct ApplicationContext {
    pub repositories: Repositories,
    pub articles: Arc<ArticleService>,
    pub auth: Arc<AuthService>,
    pub newsletter: Arc<NewsletterService>,
    pub keywords: Arc<KeywordService>,
    pub analytics: Arc<AnalyticsService>,
    pub generator: Arc<ArticleGenerator>,
    pub generation_retry: RetryPolicy,
    pub scheduler: Arc<SchedulerService>,
    pub monitor: Arc<MonitorService>,
}

impl ApplicationContext {
    pub fn new(
        repositories: Repositories,
        settings: &Settings,
        client: Arc<dyn CompletionClient>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        let articles = Arc::new(ArticleService::new(repositories.articles.clone()));
        let auth = Arc::new(AuthService::new(
            repositories.users.clone(),
            &settings.auth.jwt_secret,
            settings.auth.token_ttl,
        ));
        let newsletter = Arc::new(NewsletterService::new(repositories.subscribers.clone()));
        let keywords = Arc::new(KeywordService::new(repositories.keywords.clone()));
        let analytics = Arc::new(AnalyticsService::new(
            repositories.articles.clone(),
            repositories.subscribers.clone(),
        ));
        let generator = Arc::new(ArticleGenerator::new(
            client,
            settings.ai.max_tokens,
            settings.ai.temperature,
        ));
        let generation_retry = RetryPolicy::new(
            settings.monitor.max_retries.get(),
            settings.monitor.retry_delay,
        );
        let scheduler = Arc::new(SchedulerService::new(
            repositories.scheduled.clone(),
            articles.clone(),
            generator.clone(),
            generation_retry,
            settings.scheduler.batch_size.get(),
            settings.scheduler.lease,
        ));
        let monitor = Arc::new(MonitorService::new(
            fetcher,
            repositories.keywords.clone(),
            articles.clone(),
            generator.clone(),
            MonitorConfig::from(&settings.monitor),
        ));

        Self {
            repositories,
            articles,
            auth,
            newsletter,
            keywords,
            analytics,
            generator,
            generation_retry,
            scheduler,
            monitor,
        }
    }
}
