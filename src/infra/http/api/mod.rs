pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};

use crate::infra::http::RouterState;

/// JSON API: anonymous reader routes plus the authenticated `/api/admin` surface.
pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    let public = Router::new()
        .route("/api/auth/login", post(handlers::login))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/{slug}", get(handlers::get_article))
        .route("/api/articles/{slug}/view", post(handlers::record_view))
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/tags", get(handlers::list_tags))
        .route("/api/newsletter/subscribe", post(handlers::subscribe))
        .route("/api/newsletter/unsubscribe", post(handlers::unsubscribe));

    let authenticated = Router::new()
        .route("/api/auth/me", get(handlers::me))
        .route(
            "/api/admin/articles",
            get(handlers::list_admin_articles).post(handlers::create_article),
        )
        .route(
            "/api/admin/articles/generate",
            post(handlers::generate_article),
        )
        .route(
            "/api/admin/articles/{id}",
            get(handlers::get_admin_article)
                .patch(handlers::update_article)
                .delete(handlers::delete_article),
        )
        .route(
            "/api/admin/articles/{id}/status",
            post(handlers::update_article_status),
        )
        .route(
            "/api/admin/scheduled",
            get(handlers::list_scheduled).post(handlers::create_scheduled),
        )
        .route("/api/admin/scheduled/run", post(handlers::run_scheduled))
        .route(
            "/api/admin/scheduled/{id}",
            delete(handlers::cancel_scheduled),
        )
        .route(
            "/api/admin/monitor/keywords",
            get(handlers::list_keywords)
                .post(handlers::add_keyword)
                .put(handlers::replace_keywords),
        )
        .route(
            "/api/admin/monitor/keywords/{id}",
            delete(handlers::remove_keyword),
        )
        .route(
            "/api/admin/monitor/candidates",
            get(handlers::list_candidates),
        )
        .route("/api/admin/monitor/run", post(handlers::run_monitor))
        .route("/api/admin/analytics", get(handlers::analytics))
        .route("/api/admin/subscribers", get(handlers::list_subscribers))
        .route(
            "/api/admin/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        // Layers run bottom-up: the session is resolved before rate limiting reads it.
        .route_layer(axum_middleware::from_fn_with_state(
            state.api.clone(),
            middleware::api_rate_limit,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.api.clone(),
            middleware::require_user,
        ));

    public.merge(authenticated)
}
