mod support;

use std::sync::Arc;

use peoples_thread::application::generation::GenerationError;
use serde_json::json;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use support::{OfflineFetcher, REPLY, ScriptedClient, TestApp};

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).expect("format")
}

#[tokio::test]
async fn due_recurring_post_publishes_and_reschedules() {
    let client = Arc::new(ScriptedClient::always(REPLY));
    let app = TestApp::new(client.clone()).await;
    let token = app.admin_token().await;

    let (status, created) = app
        .json(
            "POST",
            "/api/admin/scheduled",
            Some(&token),
            Some(json!({
                "topic": "weekly labor roundup",
                "category": "labor",
                "run_at": "2024-01-01T09:00:00Z",
                "recurrence": "daily",
                "auto_publish": true,
            })),
        )
        .await;
    assert_eq!(status, 201, "{created}");
    assert_eq!(created["status"], "pending");
    assert_eq!(created["created_by"], "admin");

    let (status, report) = app
        .json("POST", "/api/admin/scheduled/run", Some(&token), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        report,
        json!({ "processed": 1, "completed": 1, "failed": 0, "rescheduled": 1 })
    );
    assert_eq!(client.calls(), 1);

    let (_, published) = app.json("GET", "/api/articles", None, None).await;
    assert_eq!(published["total"], 1);
    assert_eq!(published["items"][0]["author"], "Peoples Thread AI Desk");
    assert_eq!(published["items"][0]["ai_generated"], true);

    let (_, completed) = app
        .json(
            "GET",
            "/api/admin/scheduled?status=completed",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(completed.as_array().expect("array").len(), 1);
    assert!(completed[0]["article_id"].is_string());

    let (_, pending) = app
        .json("GET", "/api/admin/scheduled?status=pending", Some(&token), None)
        .await;
    let pending = pending.as_array().expect("array");
    assert_eq!(pending.len(), 1);
    let next_run = OffsetDateTime::parse(pending[0]["run_at"].as_str().expect("run_at"), &Rfc3339)
        .expect("rfc3339");
    assert!(next_run > OffsetDateTime::now_utc());
    assert_eq!(pending[0]["recurrence"], "daily");

    let (_, report) = app
        .json("POST", "/api/admin/scheduled/run", Some(&token), None)
        .await;
    assert_eq!(report["processed"], 0);
}

#[tokio::test]
async fn failed_generation_marks_post_failed() {
    let client = Arc::new(ScriptedClient::new(
        vec![Err(GenerationError::parse("garbled"))],
        REPLY,
    ));
    let app = TestApp::with(client, Arc::new(OfflineFetcher), "[monitor]\nmax_retries = 1\n").await;
    let token = app.admin_token().await;

    app.json(
        "POST",
        "/api/admin/scheduled",
        Some(&token),
        Some(json!({
            "topic": "city budget vote",
            "category": "politics",
            "run_at": rfc3339(OffsetDateTime::now_utc() - time::Duration::minutes(5)),
        })),
    )
    .await;

    let (_, report) = app
        .json("POST", "/api/admin/scheduled/run", Some(&token), None)
        .await;
    assert_eq!(report["processed"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["rescheduled"], 0);

    let (_, failed) = app
        .json("GET", "/api/admin/scheduled?status=failed", Some(&token), None)
        .await;
    assert_eq!(failed.as_array().expect("array").len(), 1);
    assert!(failed[0]["last_error"].as_str().expect("error").contains("garbled"));

    let (_, articles) = app
        .json("GET", "/api/admin/articles", Some(&token), None)
        .await;
    assert_eq!(articles["total"], 0);
}

#[tokio::test]
async fn only_pending_posts_can_be_cancelled() {
    let app = TestApp::new(Arc::new(ScriptedClient::always(REPLY))).await;
    let token = app.admin_token().await;

    let (_, created) = app
        .json(
            "POST",
            "/api/admin/scheduled",
            Some(&token),
            Some(json!({
                "topic": "harvest report",
                "category": "climate",
                "run_at": "2099-06-01T12:00:00Z",
            })),
        )
        .await;
    let id = created["id"].as_str().expect("id");

    let (status, cancelled) = app
        .json("DELETE", &format!("/api/admin/scheduled/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, _) = app
        .json("DELETE", &format!("/api/admin/scheduled/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, 400);

    let (status, body) = app
        .json(
            "DELETE",
            &format!("/api/admin/scheduled/{}", uuid::Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");

    let (_, report) = app
        .json("POST", "/api/admin/scheduled/run", Some(&token), None)
        .await;
    assert_eq!(report["processed"], 0);
}

#[tokio::test]
async fn scheduling_input_is_validated() {
    let app = TestApp::new(Arc::new(ScriptedClient::always(REPLY))).await;
    let token = app.admin_token().await;

    for payload in [
        json!({ "topic": "", "category": "labor", "run_at": "2099-01-01T00:00:00Z" }),
        json!({ "topic": "x", "category": "sports", "run_at": "2099-01-01T00:00:00Z" }),
        json!({ "topic": "x", "category": "labor", "run_at": "2099-01-01T00:00:00Z", "recurrence": "hourly" }),
    ] {
        let (status, body) = app
            .json("POST", "/api/admin/scheduled", Some(&token), Some(payload))
            .await;
        assert_eq!(status, 400, "{body}");
    }

    let (status, _) = app
        .json("GET", "/api/admin/scheduled?status=later", Some(&token), None)
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn writers_cannot_schedule() {
    let app = TestApp::new(Arc::new(ScriptedClient::always(REPLY))).await;
    let admin = app.admin_token().await;
    app.json(
        "POST",
        "/api/admin/users",
        Some(&admin),
        Some(json!({
            "username": "writer2",
            "email": "writer2@example.org",
            "password": "writer-password",
            "role": "writer",
        })),
    )
    .await;
    let writer = app.login("writer2", "writer-password").await;

    let (status, _) = app
        .json("GET", "/api/admin/scheduled", Some(&writer), None)
        .await;
    assert_eq!(status, 403);
}
