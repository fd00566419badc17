use axum::Json;
use axum::extract::{Extension, State};
use axum::response::IntoResponse;

use crate::application::auth::AuthPrincipal;

use super::super::error::ApiError;
use super::super::models::{LoginRequest, LoginResponse};
use super::super::state::ApiState;

pub async fn login(
    State(state): State<ApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .auth
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        expires_at: outcome.expires_at,
        user: outcome.user,
    }))
}

pub async fn me(Extension(principal): Extension<AuthPrincipal>) -> impl IntoResponse {
    Json(principal)
}
