use std::sync::Arc;

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        analytics::AnalyticsService,
        articles::{ArticleError, ArticleService},
        auth::AuthService,
        error::HttpError,
        keywords::KeywordService,
        newsletter::{NewsletterError, NewsletterService},
        pagination::PageRequest,
        repos::ArticleQueryFilter,
        scheduler::SchedulerService,
    },
    domain::{categories::Category, error::DomainError},
    infra::store::Repositories,
    presentation::views::{
        ArticleCard, ArticleDetailView, ArticleTemplate, CategoryPageView, CategoryTemplate,
        HomeView, IndexTemplate, LayoutChrome, LayoutContext, NewsletterTemplate, NewsletterView,
        StaticPageTemplate, StaticPageView, render_not_found_response, render_template_response,
    },
};

use super::{
    RouterState,
    api::{error::ApiError, models::HealthResponse},
};

const HOME_LATEST: u32 = 12;
const HOME_FEATURED: u32 = 3;
const CATEGORY_PAGE_SIZE: u32 = 12;
const RELATED_ARTICLES: u32 = 3;

#[derive(Clone)]
pub struct HttpState {
    pub articles: Arc<ArticleService>,
    pub newsletter: Arc<NewsletterService>,
    pub auth: Arc<AuthService>,
    pub analytics: Arc<AnalyticsService>,
    pub scheduler: Arc<SchedulerService>,
    pub keywords: Arc<KeywordService>,
    pub repositories: Repositories,
}

pub fn build_public_router(_state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/", get(index))
        .route("/category/{slug}", get(category_index))
        .route("/article/{slug}", get(article_detail))
        .route("/newsletter", get(newsletter_form).post(newsletter_subscribe))
        .route("/about", get(about))
        .route("/support", get(support))
        .route("/_health", get(health))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct NewsletterForm {
    #[serde(default)]
    email: String,
}

async fn index(State(state): State<HttpState>) -> Response {
    match home_view(&state.articles).await {
        Ok(content) => {
            let view = LayoutContext::new(LayoutChrome::new("", None), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => article_error_response(err),
    }
}

async fn home_view(articles: &ArticleService) -> Result<HomeView, ArticleError> {
    let breaking = articles
        .list_public(
            ArticleQueryFilter {
                breaking: Some(true),
                ..ArticleQueryFilter::default()
            },
            PageRequest::first(1),
        )
        .await?;
    let featured = articles
        .list_public(
            ArticleQueryFilter {
                featured: Some(true),
                ..ArticleQueryFilter::default()
            },
            PageRequest::first(HOME_FEATURED),
        )
        .await?;
    let latest = articles
        .list_public(ArticleQueryFilter::default(), PageRequest::first(HOME_LATEST))
        .await?;

    Ok(HomeView {
        breaking: breaking.items.first().map(ArticleCard::from),
        featured: featured.items.iter().map(ArticleCard::from).collect(),
        latest: latest.items.iter().map(ArticleCard::from).collect(),
    })
}

async fn category_index(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let Ok(category) = slug.parse::<Category>() else {
        return render_not_found_response();
    };

    let filter = ArticleQueryFilter {
        category: Some(category),
        ..ArticleQueryFilter::default()
    };
    let page = PageRequest::new(query.page, Some(CATEGORY_PAGE_SIZE));
    match state.articles.list_public(filter, page).await {
        Ok(page) => {
            let chrome = LayoutChrome::new(category.display_name(), Some(category));
            let view = LayoutContext::new(chrome, CategoryPageView::new(category, page));
            render_template_response(CategoryTemplate { view }, StatusCode::OK)
        }
        Err(err) => article_error_response(err),
    }
}

async fn article_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let mut article = match state.articles.find_public_by_slug(&slug).await {
        Ok(article) => article,
        Err(err) => return article_error_response(err),
    };

    match state.articles.record_view(&article.slug).await {
        Ok(count) => article.view_count = count,
        Err(err) => warn!(
            target = "peoples_thread::infra::http::public",
            slug = %article.slug,
            error = %err,
            "failed to record article view"
        ),
    }

    let related = match state.articles.related(&article, RELATED_ARTICLES).await {
        Ok(related) => related,
        Err(err) => return article_error_response(err),
    };

    let chrome = LayoutChrome::new(&article.title, Some(article.category))
        .with_description(&article.excerpt);
    let view = LayoutContext::new(chrome, ArticleDetailView::new(&article, &related));
    render_template_response(ArticleTemplate { view }, StatusCode::OK)
}

async fn newsletter_form() -> Response {
    render_newsletter(NewsletterView::default(), StatusCode::OK)
}

async fn newsletter_subscribe(
    State(state): State<HttpState>,
    Form(form): Form<NewsletterForm>,
) -> Response {
    match state.newsletter.subscribe(&form.email).await {
        Ok(outcome) => {
            let message = if outcome.already_subscribed {
                "You are already on the list. Thanks for reading!"
            } else if outcome.reactivated {
                "Welcome back! Your subscription is active again."
            } else {
                "Thanks for subscribing! Look for the next issue in your inbox."
            };
            render_newsletter(
                NewsletterView {
                    email: String::new(),
                    message: Some(message.to_string()),
                    error: None,
                },
                StatusCode::OK,
            )
        }
        Err(NewsletterError::Domain(err)) => render_newsletter(
            NewsletterView {
                email: form.email,
                message: None,
                error: Some(err.to_string()),
            },
            StatusCode::BAD_REQUEST,
        ),
        Err(NewsletterError::Repo(err)) => HttpError::from(err).into_response(),
    }
}

fn render_newsletter(content: NewsletterView, status: StatusCode) -> Response {
    let view = LayoutContext::new(LayoutChrome::new("Newsletter", None), content);
    render_template_response(NewsletterTemplate { view }, status)
}

async fn about() -> Response {
    let view = LayoutContext::new(LayoutChrome::new("About", None), StaticPageView::about());
    render_template_response(StaticPageTemplate { view }, StatusCode::OK)
}

async fn support() -> Response {
    let view = LayoutContext::new(LayoutChrome::new("Support", None), StaticPageView::support());
    render_template_response(StaticPageTemplate { view }, StatusCode::OK)
}

async fn health(State(state): State<HttpState>) -> Response {
    let storage = state.repositories.kind();
    match state.repositories.health_check().await {
        Ok(()) => Json(HealthResponse {
            status: "ok",
            storage,
        })
        .into_response(),
        Err(err) => HttpError::from_error(
            "infra::http::public::health",
            StatusCode::SERVICE_UNAVAILABLE,
            "Storage unavailable",
            &err,
        )
        .into_response(),
    }
}

/// Unmatched paths: JSON under `/api`, the HTML 404 page elsewhere.
pub(super) async fn not_found(request: Request<Body>) -> Response {
    if request.uri().path().starts_with("/api") {
        return ApiError::not_found("Route not found").into_response();
    }
    render_not_found_response()
}

fn article_error_response(err: ArticleError) -> Response {
    match err {
        ArticleError::Domain(DomainError::NotFound { .. }) => render_not_found_response(),
        ArticleError::Repo(err) => HttpError::from(err).into_response(),
        other => HttpError::from_error(
            "infra::http::public",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &other,
        )
        .into_response(),
    }
}
