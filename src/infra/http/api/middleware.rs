use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::application::auth::AuthPrincipal;

use super::error::ApiError;
use super::state::ApiState;
use crate::infra::http::SESSION_COOKIE;

const UNMATCHED_ROUTE: &str = "<unmatched>";

/// Resolve the session from `Authorization: Bearer` or the dashboard cookie.
pub async fn require_user(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match session_token(request.headers()) {
        Some(token) => token,
        None => return ApiError::unauthorized().into_response(),
    };

    let principal = match state.auth.verify(&token) {
        Ok(principal) => principal,
        Err(err) => return ApiError::from(err).into_response(),
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let principal = match request.extensions().get::<AuthPrincipal>() {
        Some(p) => p,
        None => {
            warn!(
                target = "peoples_thread::api::ratelimit",
                "missing principal in rate limit middleware"
            );
            return ApiError::unauthorized().into_response();
        }
    };

    let (allowed, remaining) = state.rate_limiter.allow(principal.user_id, &route);
    if !allowed {
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if let Ok(value) = state.rate_limiter.limit().to_string().parse() {
        headers.insert("x-ratelimit-limit", value);
    }
    if let Ok(value) = remaining.to_string().parse() {
        headers.insert("x-ratelimit-remaining", value);
    }
    response
}

pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    (!bearer.is_empty()).then(|| bearer.to_string())
}
