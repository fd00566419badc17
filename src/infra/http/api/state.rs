use std::sync::Arc;

use crate::application::{
    analytics::AnalyticsService,
    articles::ArticleService,
    auth::{AuthPrincipal, AuthService},
    generation::{ArticleGenerator, RetryPolicy},
    keywords::KeywordService,
    monitor::MonitorService,
    newsletter::NewsletterService,
    scheduler::SchedulerService,
};

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub articles: Arc<ArticleService>,
    pub auth: Arc<AuthService>,
    pub newsletter: Arc<NewsletterService>,
    pub keywords: Arc<KeywordService>,
    pub analytics: Arc<AnalyticsService>,
    pub scheduler: Arc<SchedulerService>,
    pub monitor: Arc<MonitorService>,
    pub generator: Arc<ArticleGenerator>,
    pub generation_retry: RetryPolicy,
    pub rate_limiter: Arc<ApiRateLimiter>,
}

impl ApiState {
    pub fn actor_label(principal: &AuthPrincipal) -> String {
        format!("user:{}", principal.username)
    }
}
