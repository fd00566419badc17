use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::auth::AuthPrincipal;
use crate::application::scheduler::CreateScheduledCommand;
use crate::domain::permissions::Permission;
use crate::domain::types::ScheduleStatus;

use super::super::error::ApiError;
use super::super::models::ScheduledListQuery;
use super::super::state::ApiState;

pub async fn list_scheduled(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Query(query): Query<ScheduledListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::SchedulerManage)?;

    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(status) => Some(status.parse::<ScheduleStatus>()?),
        None => None,
    };
    Ok(Json(state.scheduler.list(status).await?))
}

pub async fn create_scheduled(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(payload): Json<CreateScheduledCommand>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::SchedulerManage)?;
    if payload.auto_publish {
        principal.requires(Permission::ArticlesPublish)?;
    }

    let record = state
        .scheduler
        .create(&principal.username, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn cancel_scheduled(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::SchedulerManage)?;

    Ok(Json(state.scheduler.cancel(id).await?))
}

/// Poll immediately instead of waiting for the next cron tick.
pub async fn run_scheduled(
    State(state): State<ApiState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Permission::SchedulerManage)?;

    let report = state.scheduler.run_due(OffsetDateTime::now_utc()).await?;
    Ok(Json(report))
}
