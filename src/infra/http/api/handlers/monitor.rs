use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::auth::AuthPrincipal;
use crate::application::monitor::MonitorTrigger;
use crate::domain::permissions::Permission;

use super::super::error::ApiError;
use super::super::models::{KeywordRequest, KeywordsReplaceRequest};
use super::super::state::ApiState;

/// -------- Keywords --------
pub async fn list_keywords(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::MonitorRun)?;

    Ok(Json(state.keywords.list().await?))
}

pub async fn add_keyword(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(payload): Json<KeywordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::MonitorRun)?;

    let keyword = state.keywords.add(&payload.keyword).await?;
    Ok((StatusCode::CREATED, Json(keyword)))
}

pub async fn replace_keywords(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(payload): Json<KeywordsReplaceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::MonitorRun)?;

    Ok(Json(state.keywords.replace_all(&payload.keywords).await?))
}

pub async fn remove_keyword(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::MonitorRun)?;

    state.keywords.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// -------- Runs --------
pub async fn list_candidates(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::MonitorRun)?;

    Ok(Json(state.monitor.candidates().await?))
}

pub async fn run_monitor(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::MonitorRun)?;

    Ok(Json(state.monitor.run(MonitorTrigger::Manual).await?))
}
