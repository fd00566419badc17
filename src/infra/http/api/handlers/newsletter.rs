use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::super::error::ApiError;
use super::super::models::EmailRequest;
use super::super::state::ApiState;

pub async fn subscribe(
    State(state): State<ApiState>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.newsletter.subscribe(&payload.email).await?;
    let status = if outcome.already_subscribed || outcome.reactivated {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

pub async fn unsubscribe(
    State(state): State<ApiState>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let subscriber = state.newsletter.unsubscribe(&payload.email).await?;
    Ok(Json(subscriber))
}
