use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::{
    articles::ArticleError,
    auth::AuthError,
    error::ErrorReport,
    generation::GenerationError,
    keywords::KeywordError,
    monitor::MonitorError,
    newsletter::NewsletterError,
    repos::RepoError,
    scheduler::SchedulerError,
};
use crate::domain::error::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const TOKEN_EXPIRED: &str = "token_expired";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const CONFLICT: &str = "conflict";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const INTERNAL: &str = "internal_error";
    pub const AI_NOT_CONFIGURED: &str = "ai_not_configured";
    pub const AI_UPSTREAM: &str = "ai_upstream_error";
    pub const AI_INVALID_RESPONSE: &str = "ai_invalid_response";
    pub const FEED_UNAVAILABLE: &str = "feed_unavailable";
    pub const MONITOR_BUSY: &str = "monitor_busy";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Authentication required",
            None,
        )
    }

    pub fn forbidden(hint: Option<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::FORBIDDEN,
            "Missing permission for this action",
            hint,
        )
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: codes::RATE_LIMITED.to_string(),
                message: "Rate limit exceeded".to_string(),
                hint: Some(format!("Retry after {retry_after} seconds")),
            },
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            "infra::http::api::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate_limited: retry_after={retry_after}"),
        )
        .attach(&mut response);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity } => Self::new(
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
                "Resource not found",
                Some(format!("{entity} not found")),
            ),
            DomainError::Validation { field, message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Validation failed",
                Some(format!("{field}: {message}")),
            ),
            DomainError::Invariant { message } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                codes::INVALID_INPUT,
                "Request cannot be applied",
                Some(message),
            ),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::not_found("Resource not found"),
            RepoError::Duplicate { constraint } => Self::new(
                StatusCode::CONFLICT,
                codes::CONFLICT,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::InvalidInput { message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Storage timeout",
                None,
            ),
            RepoError::Persistence(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }
}

impl From<ArticleError> for ApiError {
    fn from(err: ArticleError) -> Self {
        match err {
            ArticleError::Domain(err) => err.into(),
            ArticleError::Conflict { field } => Self::new(
                StatusCode::CONFLICT,
                codes::CONFLICT,
                "Article already exists",
                Some(format!("an article with this {field} already exists")),
            ),
            ArticleError::Repo(err) => err.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::UNAUTHORIZED,
                "Invalid username or password",
                None,
            ),
            AuthError::InvalidToken => Self::unauthorized(),
            AuthError::Expired => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::TOKEN_EXPIRED,
                "Session expired",
                Some("log in again".to_string()),
            ),
            AuthError::Forbidden { permission } => {
                Self::forbidden(Some(format!("requires `{}`", permission.as_str())))
            }
            AuthError::Validation(err) => err.into(),
            AuthError::UsernameTaken(username) => Self::new(
                StatusCode::CONFLICT,
                codes::CONFLICT,
                "Username already taken",
                Some(username),
            ),
            AuthError::Hash(message) | AuthError::Token(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL,
                "Authentication failure",
                Some(message),
            ),
            AuthError::Repo(err) => err.into(),
        }
    }
}

impl From<NewsletterError> for ApiError {
    fn from(err: NewsletterError) -> Self {
        match err {
            NewsletterError::Domain(err) => err.into(),
            NewsletterError::Repo(err) => err.into(),
        }
    }
}

impl From<KeywordError> for ApiError {
    fn from(err: KeywordError) -> Self {
        match err {
            KeywordError::Domain(err) => err.into(),
            KeywordError::Duplicate(keyword) => Self::new(
                StatusCode::CONFLICT,
                codes::CONFLICT,
                "Keyword already exists",
                Some(keyword),
            ),
            KeywordError::Repo(err) => err.into(),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Domain(err) => err.into(),
            SchedulerError::Repo(err) => err.into(),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        let hint = Some(err.to_string());
        match err {
            GenerationError::NotConfigured => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::AI_NOT_CONFIGURED,
                "AI generation is not configured",
                Some("set ai.api_key".to_string()),
            ),
            GenerationError::Upstream { .. } | GenerationError::Transport(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::AI_UPSTREAM,
                "AI service request failed",
                hint,
            ),
            GenerationError::Parse(_) | GenerationError::Empty => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::AI_INVALID_RESPONSE,
                "AI service returned an unusable response",
                hint,
            ),
        }
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::AlreadyRunning => Self::new(
                StatusCode::CONFLICT,
                codes::MONITOR_BUSY,
                "A monitor run is already in progress",
                None,
            ),
            MonitorError::Feed(err) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::FEED_UNAVAILABLE,
                "Source feed could not be fetched",
                Some(err.to_string()),
            ),
            MonitorError::Repo(err) => err.into(),
            MonitorError::Article(err) => err.into(),
        }
    }
}
