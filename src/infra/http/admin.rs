//! Server-rendered dashboard behind a cookie session.

use axum::{
    Form, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::info;

use crate::{
    application::{
        auth::{AuthError, AuthPrincipal},
        error::HttpError,
        pagination::PageRequest,
        repos::ArticleQueryFilter,
    },
    domain::{
        permissions::Permission,
        types::{ArticleStatus, ScheduleStatus},
    },
    presentation::admin::views::{
        AdminDashboardTemplate, AdminDashboardView, AdminLayout, AdminLoginTemplate,
        AdminLoginView,
    },
    presentation::views::render_template_response,
};

use super::{HttpState, RouterState, api::middleware::session_token};

pub const SESSION_COOKIE: &str = "pt_session";

const DASHBOARD_DRAFTS: u32 = 20;

pub fn build_admin_router(_state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/login", get(login_form).post(login_submit))
        .route("/admin/logout", post(logout).get(logout))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login_form(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    if current_principal(&state, &headers).is_some() {
        return Redirect::to("/admin").into_response();
    }
    render_login(AdminLoginView::default(), StatusCode::OK)
}

async fn login_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.auth.login(&form.username, &form.password).await {
        Ok(outcome) => {
            info!(
                target = "peoples_thread::infra::http::admin",
                username = %outcome.user.username,
                "dashboard session started"
            );
            let max_age = i64::try_from(state.auth.token_ttl().as_secs()).unwrap_or(i64::MAX);
            let cookie = Cookie::build((SESSION_COOKIE, outcome.token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .max_age(time::Duration::seconds(max_age));
            (jar.add(cookie), Redirect::to("/admin")).into_response()
        }
        Err(AuthError::InvalidCredentials) => render_login(
            AdminLoginView {
                username: form.username,
                error: Some("Invalid username or password.".to_string()),
            },
            StatusCode::UNAUTHORIZED,
        ),
        Err(err) => HttpError::from_error(
            "infra::http::admin::login_submit",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Login failed",
            &err,
        )
        .into_response(),
    }
}

async fn logout(jar: CookieJar) -> Response {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/admin/login")).into_response()
}

async fn dashboard(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(principal) = current_principal(&state, &headers) else {
        return Redirect::to("/admin/login").into_response();
    };

    let mut response = match dashboard_view(&state, &principal).await {
        Ok(content) => {
            let view = AdminLayout::new("Dashboard", Some(principal.username.clone()), content);
            render_template_response(AdminDashboardTemplate { view }, StatusCode::OK)
        }
        Err(err) => err.into_response(),
    };
    response.extensions_mut().insert(principal);
    response
}

async fn dashboard_view(
    state: &HttpState,
    principal: &AuthPrincipal,
) -> Result<AdminDashboardView, HttpError> {
    let source = "infra::http::admin::dashboard";
    let summary = state.analytics.summary().await?;

    let drafts = state
        .articles
        .list_admin(
            ArticleQueryFilter {
                status: Some(ArticleStatus::Draft),
                ..ArticleQueryFilter::default()
            },
            PageRequest::first(DASHBOARD_DRAFTS),
        )
        .await
        .map_err(|err| {
            HttpError::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, "Dashboard failed", &err)
        })?;

    let scheduled = if principal.can(Permission::SchedulerManage) {
        state
            .scheduler
            .list(Some(ScheduleStatus::Pending))
            .await
            .map_err(|err| {
                HttpError::from_error(
                    source,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Dashboard failed",
                    &err,
                )
            })?
    } else {
        Vec::new()
    };

    let keywords = if principal.can(Permission::MonitorRun) {
        state.keywords.list().await.map_err(|err| {
            HttpError::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, "Dashboard failed", &err)
        })?
    } else {
        Vec::new()
    };

    Ok(AdminDashboardView::new(
        &summary,
        &drafts.items,
        &scheduled,
        &keywords,
    ))
}

fn current_principal(state: &HttpState, headers: &HeaderMap) -> Option<AuthPrincipal> {
    let token = session_token(headers)?;
    state.auth.verify(&token).ok()
}

fn render_login(content: AdminLoginView, status: StatusCode) -> Response {
    let view = AdminLayout::new("Sign in", None, content);
    render_template_response(AdminLoginTemplate { view }, status)
}
