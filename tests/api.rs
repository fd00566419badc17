mod support;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;

use support::{ADMIN_PASSWORD, REPLY, ScriptedClient, TestApp, body_text};

async fn app() -> TestApp {
    TestApp::new(Arc::new(ScriptedClient::always(REPLY))).await
}

#[tokio::test]
async fn health_reports_file_storage() {
    let app = app().await;
    let (status, body) = app.json("GET", "/_health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "file");
}

#[tokio::test]
async fn login_issues_token_and_rejects_bad_password() {
    let app = app().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "unauthorized");

    let token = app.admin_token().await;
    let (status, me) = app.json("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(me["username"], "admin");
    assert_eq!(me["role"], "admin");
}

#[tokio::test]
async fn admin_routes_require_a_session() {
    let app = app().await;

    let (status, body) = app.json("GET", "/api/admin/articles", None, None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = app
        .json("GET", "/api/admin/articles", Some("not-a-token"), None)
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn drafts_stay_private_until_published() {
    let app = app().await;
    let token = app.admin_token().await;

    let (status, created) = app
        .json(
            "POST",
            "/api/admin/articles",
            Some(&token),
            Some(json!({
                "title": "Transit strike ends",
                "body": "Workers return Monday.\n\nThe contract runs three years.",
                "category": "labor",
                "tags": ["Transit", "unions", "transit"],
            })),
        )
        .await;
    assert_eq!(status, 201, "{created}");
    assert_eq!(created["status"], "draft");
    assert_eq!(created["author"], "admin");
    assert_eq!(created["tags"], json!(["transit", "unions"]));
    let slug = created["slug"].as_str().expect("slug").to_string();
    let id = created["id"].as_str().expect("id").to_string();

    let (status, body) = app
        .json("GET", &format!("/api/articles/{slug}"), None, None)
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, published) = app
        .json(
            "POST",
            &format!("/api/admin/articles/{id}/status"),
            Some(&token),
            Some(json!({ "status": "published" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(published["status"], "published");
    assert!(published["published_at"].is_string());

    let (status, listed) = app.json("GET", "/api/articles", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["slug"], slug.as_str());

    let (status, view) = app
        .json("POST", &format!("/api/articles/{slug}/view"), None, None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(view["view_count"], 1);

    let (status, categories) = app.json("GET", "/api/categories", None, None).await;
    assert_eq!(status, 200);
    let labor = categories
        .as_array()
        .expect("array")
        .iter()
        .find(|c| c["category"] == "labor")
        .expect("labor category");
    assert_eq!(labor["articles"], 1);
}

#[tokio::test]
async fn invalid_article_input_is_rejected() {
    let app = app().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/admin/articles",
            Some(&token),
            Some(json!({ "title": "  ", "body": "text", "category": "labor" })),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "invalid_input");

    let (status, _) = app
        .json(
            "POST",
            "/api/admin/articles",
            Some(&token),
            Some(json!({ "title": "Title", "body": "text", "category": "sports" })),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .json("GET", "/api/articles?status=bogus", None, None)
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn writers_cannot_publish_or_manage_users() {
    let app = app().await;
    let admin = app.admin_token().await;

    let (status, user) = app
        .json(
            "POST",
            "/api/admin/users",
            Some(&admin),
            Some(json!({
                "username": "writer1",
                "email": "writer1@example.org",
                "password": "writer-password",
                "role": "writer",
            })),
        )
        .await;
    assert_eq!(status, 201, "{user}");
    assert!(user.get("password_hash").is_none());

    let writer = app.login("writer1", "writer-password").await;

    let (status, draft) = app
        .json(
            "POST",
            "/api/admin/articles",
            Some(&writer),
            Some(json!({ "title": "Rent freeze", "body": "Tenants rally.", "category": "politics" })),
        )
        .await;
    assert_eq!(status, 201);
    let id = draft["id"].as_str().expect("id");

    let (status, body) = app
        .json(
            "POST",
            &format!("/api/admin/articles/{id}/status"),
            Some(&writer),
            Some(json!({ "status": "published" })),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, _) = app.json("GET", "/api/admin/users", Some(&writer), None).await;
    assert_eq!(status, 403);

    let (status, _) = app
        .json("DELETE", &format!("/api/admin/articles/{id}"), Some(&writer), None)
        .await;
    assert_eq!(status, 403);

    let (status, _) = app
        .json("DELETE", &format!("/api/admin/articles/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, 204);
}

#[tokio::test]
async fn duplicate_usernames_conflict() {
    let app = app().await;
    let admin = app.admin_token().await;
    let payload = json!({
        "username": "admin",
        "email": "other@example.org",
        "password": "another-password",
        "role": "editor",
    });

    let (status, body) = app
        .json("POST", "/api/admin/users", Some(&admin), Some(payload))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn generate_creates_ai_draft() {
    let client = Arc::new(ScriptedClient::always(REPLY));
    let app = TestApp::new(client.clone()).await;
    let token = app.admin_token().await;

    let (status, article) = app
        .json(
            "POST",
            "/api/admin/articles/generate",
            Some(&token),
            Some(json!({ "topic": "hospital staffing", "category": "labor" })),
        )
        .await;
    assert_eq!(status, 201, "{article}");
    assert_eq!(article["title"], "Nurses vote to strike at county hospital");
    assert_eq!(article["status"], "draft");
    assert_eq!(article["ai_generated"], true);
    assert_eq!(article["author"], "admin");
    assert_eq!(client.calls(), 1);

    let (status, _) = app
        .json(
            "POST",
            "/api/admin/articles/generate",
            Some(&token),
            Some(json!({ "topic": " ", "category": "labor" })),
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn newsletter_subscription_is_idempotent() {
    let app = app().await;

    let (status, first) = app
        .json(
            "POST",
            "/api/newsletter/subscribe",
            None,
            Some(json!({ "email": " Reader@Example.org " })),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(first["subscriber"]["email"], "reader@example.org");

    let (status, again) = app
        .json(
            "POST",
            "/api/newsletter/subscribe",
            None,
            Some(json!({ "email": "reader@example.org" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(again["already_subscribed"], true);

    let (status, _) = app
        .json(
            "POST",
            "/api/newsletter/subscribe",
            None,
            Some(json!({ "email": "not-an-email" })),
        )
        .await;
    assert_eq!(status, 400);

    let (status, left) = app
        .json(
            "POST",
            "/api/newsletter/unsubscribe",
            None,
            Some(json!({ "email": "reader@example.org" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(left["active"], false);

    let token = app.admin_token().await;
    let (status, active) = app
        .json(
            "GET",
            "/api/admin/subscribers?active_only=true",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(active, json!([]));
}

#[tokio::test]
async fn keywords_are_normalized_and_unique() {
    let app = app().await;
    let token = app.admin_token().await;

    let (status, keyword) = app
        .json(
            "POST",
            "/api/admin/monitor/keywords",
            Some(&token),
            Some(json!({ "keyword": "  Minimum   Wage " })),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(keyword["keyword"], "minimum wage");

    let (status, body) = app
        .json(
            "POST",
            "/api/admin/monitor/keywords",
            Some(&token),
            Some(json!({ "keyword": "minimum wage" })),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "conflict");

    let (status, replaced) = app
        .json(
            "PUT",
            "/api/admin/monitor/keywords",
            Some(&token),
            Some(json!({ "keywords": ["Strike", "union", "strike"] })),
        )
        .await;
    assert_eq!(status, 200);
    let words: Vec<_> = replaced
        .as_array()
        .expect("array")
        .iter()
        .map(|k| k["keyword"].as_str().expect("keyword").to_string())
        .collect();
    assert_eq!(words.len(), 2);
    assert!(words.contains(&"strike".to_string()));

    let id = replaced[0]["id"].as_str().expect("id");
    let (status, _) = app
        .json(
            "DELETE",
            &format!("/api/admin/monitor/keywords/{id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, 204);
}

#[tokio::test]
async fn analytics_counts_articles_and_subscribers() {
    let app = app().await;
    let token = app.admin_token().await;

    app.json(
        "POST",
        "/api/admin/articles",
        Some(&token),
        Some(json!({
            "title": "Heat wave",
            "body": "Temperatures climb.",
            "category": "climate",
            "status": "published",
        })),
    )
    .await;
    app.json(
        "POST",
        "/api/newsletter/subscribe",
        None,
        Some(json!({ "email": "a@example.org" })),
    )
    .await;

    let (status, summary) = app
        .json("GET", "/api/admin/analytics", Some(&token), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(summary["published"], 1);
    assert_eq!(summary["total_articles"], 1);
    assert_eq!(summary["subscribers"], 1);
}

#[tokio::test]
async fn unknown_api_route_is_json_404() {
    let app = app().await;
    let (status, body) = app.json("GET", "/api/nope", None, None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn admin_requests_are_rate_limited_per_route() {
    let client = Arc::new(ScriptedClient::always(REPLY));
    let app = TestApp::with(
        client,
        Arc::new(support::OfflineFetcher),
        "[rate_limit]\nwindow_seconds = 60\nmax_requests = 2\n",
    )
    .await;
    let token = app.admin_token().await;

    for _ in 0..2 {
        let (status, _) = app.json("GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, 200);
    }
    let (status, body) = app.json("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, 429);
    assert_eq!(body["error"]["code"], "rate_limited");

    let (status, _) = app
        .json("GET", "/api/admin/analytics", Some(&token), None)
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn rate_limit_buckets_follow_the_route_template() {
    let client = Arc::new(ScriptedClient::always(REPLY));
    let app = TestApp::with(
        client,
        Arc::new(support::OfflineFetcher),
        "[rate_limit]\nwindow_seconds = 60\nmax_requests = 2\n",
    )
    .await;
    let token = app.admin_token().await;

    for _ in 0..2 {
        let uri = format!("/api/admin/articles/{}", uuid::Uuid::new_v4());
        let (status, _) = app.json("GET", &uri, Some(&token), None).await;
        assert_eq!(status, 404);
    }
    let uri = format!("/api/admin/articles/{}", uuid::Uuid::new_v4());
    let (status, body) = app.json("GET", &uri, Some(&token), None).await;
    assert_eq!(status, 429);
    assert_eq!(body["error"]["code"], "rate_limited");
}

#[tokio::test]
async fn public_pages_render_published_articles() {
    let app = app().await;
    let token = app.admin_token().await;

    let (_, article) = app
        .json(
            "POST",
            "/api/admin/articles",
            Some(&token),
            Some(json!({
                "title": "Dock workers <b>organize</b>",
                "body": "First paragraph.\n\nSecond <script>alert(1)</script> paragraph.",
                "category": "labor",
                "status": "published",
                "breaking": true,
            })),
        )
        .await;
    let slug = article["slug"].as_str().expect("slug");

    let response = app
        .send(Request::get("/").body(Body::empty()).expect("request"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Breaking"));
    assert!(html.contains(&format!("/article/{slug}")));

    let response = app
        .send(
            Request::get(format!("/article/{slug}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<p>First paragraph.</p>"));
    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("1 views"));

    let response = app
        .send(Request::get("/category/labor").body(Body::empty()).expect("request"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(Request::get("/category/sports").body(Body::empty()).expect("request"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(Request::get("/article/missing").body(Body::empty()).expect("request"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn newsletter_form_subscribes() {
    let app = app().await;
    let response = app
        .send(
            Request::post("/newsletter")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=form%40example.org"))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Thanks for subscribing"));

    let response = app
        .send(
            Request::post("/newsletter")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=nope"))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_uses_cookie_session() {
    let app = app().await;

    let response = app
        .send(Request::get("/admin").body(Body::empty()).expect("request"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/admin/login");

    let response = app
        .send(
            Request::post("/admin/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!(
                    "username=admin&password={ADMIN_PASSWORD}"
                )))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .expect("cookie header")
        .to_string();
    assert!(cookie.starts_with("pt_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    let pair = cookie.split(';').next().expect("cookie pair").to_string();

    let response = app
        .send(
            Request::get("/admin")
                .header(header::COOKIE, &pair)
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Signed in as admin"));
    assert!(html.contains("Drafts awaiting review"));

    let (status, me) = {
        let response = app
            .send(
                Request::get("/api/auth/me")
                    .header(header::COOKIE, &pair)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await;
        let status = response.status();
        (status, body_text(response).await)
    };
    assert_eq!(status, StatusCode::OK);
    assert!(me.contains("\"admin\""));

    let response = app
        .send(
            Request::post("/admin/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=admin&password=nope"))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
