mod admin;
pub mod api;
mod middleware;
mod public;

pub use admin::SESSION_COOKIE;
pub use api::rate_limit::ApiRateLimiter;
pub use api::{ApiState, build_api_router};
pub use public::{HttpState, build_public_router};

use std::{sync::Arc, time::Duration};

use axum::{Router, extract::FromRef};

use crate::{config::RateLimitSettings, infra::app::ApplicationContext};

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub api: ApiState,
}

impl RouterState {
    pub fn new(context: &ApplicationContext, rate_limit: &RateLimitSettings) -> Self {
        let rate_limiter = Arc::new(ApiRateLimiter::new(
            Duration::from_secs(u64::from(rate_limit.window_seconds.get())),
            rate_limit.max_requests.get(),
        ));

        Self {
            http: HttpState {
                articles: context.articles.clone(),
                newsletter: context.newsletter.clone(),
                auth: context.auth.clone(),
                analytics: context.analytics.clone(),
                scheduler: context.scheduler.clone(),
                keywords: context.keywords.clone(),
                repositories: context.repositories.clone(),
            },
            api: ApiState {
                articles: context.articles.clone(),
                auth: context.auth.clone(),
                newsletter: context.newsletter.clone(),
                keywords: context.keywords.clone(),
                analytics: context.analytics.clone(),
                scheduler: context.scheduler.clone(),
                monitor: context.monitor.clone(),
                generator: context.generator.clone(),
                generation_retry: context.generation_retry,
                rate_limiter,
            },
        }
    }
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

/// Every surface on one router: public pages, the admin dashboard and the JSON API.
pub fn build_router(state: RouterState) -> Router {
    public::build_public_router(state.clone())
        .merge(admin::build_admin_router(state.clone()))
        .merge(api::build_api_router(state.clone()))
        .fallback(public::not_found)
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::log_responses))
        .layer(axum::middleware::from_fn(middleware::set_request_context))
}
