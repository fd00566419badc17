use axum::Json;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::auth::{AuthPrincipal, CreateUserCommand, UserSummary};
use crate::domain::permissions::Permission;

use super::super::error::ApiError;
use super::super::models::{CreateUserRequest, SubscribersQuery};
use super::super::state::ApiState;

pub async fn analytics(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::AnalyticsRead)?;

    Ok(Json(state.analytics.summary().await?))
}

pub async fn list_subscribers(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Query(query): Query<SubscribersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::NewsletterManage)?;

    let subscribers = state
        .newsletter
        .list(query.active_only.unwrap_or(false))
        .await?;
    Ok(Json(subscribers))
}

pub async fn list_users(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::UsersManage)?;

    Ok(Json(state.auth.list_users().await?))
}

pub async fn create_user(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::UsersManage)?;

    let user = state
        .auth
        .create_user(CreateUserCommand {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            role: payload.role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(UserSummary::from(&user))))
}
