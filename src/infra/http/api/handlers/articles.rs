use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::articles::{CreateArticleCommand, GeneratedDraft, UpdateArticleCommand};
use crate::application::auth::AuthPrincipal;
use crate::application::generation::TopicPrompt;
use crate::domain::categories::Category;
use crate::domain::error::DomainError;
use crate::domain::permissions::Permission;

use super::super::error::ApiError;
use super::super::models::{ArticleListQuery, GenerateRequest, StatusRequest, ViewResponse};
use super::super::state::ApiState;

/// -------- Public --------
pub async fn list_articles(
    State(state): State<ApiState>,
    Query(query): Query<ArticleListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.filter()?;
    let page = state
        .articles
        .list_public(filter, query.page_request())
        .await?;
    Ok(Json(page))
}

pub async fn get_article(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.articles.find_public_by_slug(&slug).await?;
    Ok(Json(article))
}

pub async fn record_view(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view_count = state.articles.record_view(&slug).await?;
    Ok(Json(ViewResponse { slug, view_count }))
}

pub async fn list_categories(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.articles.category_counts().await?))
}

pub async fn list_tags(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.articles.tag_counts().await?))
}

/// -------- Admin --------
pub async fn list_admin_articles(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Query(query): Query<ArticleListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::ArticlesRead)?;

    let filter = query.filter()?;
    let page = state
        .articles
        .list_admin(filter, query.page_request())
        .await?;
    Ok(Json(page))
}

pub async fn get_admin_article(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::ArticlesRead)?;

    Ok(Json(state.articles.find_by_id(id).await?))
}

pub async fn create_article(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(payload): Json<CreateArticleCommand>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::ArticlesWrite)?;
    if payload
        .status
        .is_some_and(|status| status != crate::domain::types::ArticleStatus::Draft)
    {
        principal.requires(Permission::ArticlesPublish)?;
    }

    // The username doubles as the byline when the payload omits one.
    let article = state.articles.create(&principal.username, payload).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn update_article(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateArticleCommand>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::ArticlesWrite)?;

    let actor = ApiState::actor_label(&principal);
    let article = state.articles.update(&actor, id, payload).await?;
    Ok(Json(article))
}

pub async fn update_article_status(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::ArticlesPublish)?;

    let actor = ApiState::actor_label(&principal);
    let article = state.articles.set_status(&actor, id, payload.status).await?;
    Ok(Json(article))
}

pub async fn delete_article(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::ArticlesDelete)?;

    let actor = ApiState::actor_label(&principal);
    state.articles.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Draft (or publish) an article written by the AI service from a topic.
pub async fn generate_article(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(payload): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::ArticlesWrite)?;
    if payload.publish {
        principal.requires(Permission::ArticlesPublish)?;
    }

    let topic = payload.topic.trim();
    if topic.is_empty() {
        return Err(DomainError::validation("topic", "topic is required").into());
    }
    let category: Category = payload.category.parse()?;

    let prompt = TopicPrompt {
        topic,
        category,
        instructions: payload.instructions.as_deref(),
    }
    .render();
    let generated = state
        .generator
        .generate_with_retry(&prompt, category, state.generation_retry)
        .await?;
    let article = state
        .articles
        .create_generated(GeneratedDraft {
            article: generated,
            author: principal.username.clone(),
            publish: payload.publish,
            source_url: None,
            source_title: None,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(article)))
}
