mod support;

use std::{sync::Arc, time::Duration};

use httpmock::MockServer;
use peoples_thread::{
    application::monitor::MonitorTrigger,
    domain::{categories::Category, types::ArticleStatus},
    infra::{ai::OpenAiClient, fetch::HttpFetcher},
};
use serde_json::json;

use support::{REPLY, ScriptedClient, TestApp};

fn feed(server: &MockServer) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>PBS NewsHour - Headlines</title>
  <item>
    <title><![CDATA[Dockworkers strike at Gulf ports]]></title>
    <link>{strike}</link>
    <description><![CDATA[<p>Ports from Texas to Florida are idle.</p>]]></description>
    <pubDate>Tue, 01 Oct 2024 12:00:00 +0000</pubDate>
  </item>
  <item>
    <title>Museum opens new wing</title>
    <link>{museum}</link>
    <description>A new gallery for local artists.</description>
  </item>
</channel></rss>"#,
        strike = server.url("/newshour/economy/dockworkers-strike"),
        museum = server.url("/newshour/arts/museum-wing"),
    )
}

/// Feed of `count` strike stories under `/newshour/labor/`.
fn strike_feed(server: &MockServer, count: usize) -> String {
    let items: String = (1..=count)
        .map(|n| {
            format!(
                "<item><title>Strike day {n} at the mill</title><link>{}</link>\
                 <description>Picket lines held on day {n}.</description></item>",
                server.url(format!("/newshour/labor/strike-{n}"))
            )
        })
        .collect();
    format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Feed</title>{items}</channel></rss>"#)
}

const STORY: &str = r#"<html><head><script>var tracking = 1;</script></head>
<body><nav>Menu</nav>
<p>Dockworkers walked off the job at midnight.</p>
<p>The union is asking for protection from automation.</p>
</body></html>"#;

fn completion_body() -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": REPLY } }] }).to_string()
}

/// App wired to the mock server for the feed, source pages and the AI endpoint.
async fn monitor_app(server: &MockServer, extra: &str) -> TestApp {
    let config = format!(
        "[ai]\nbase_url = \"{}\"\napi_key = \"test-key\"\n\n[monitor]\nfeed_url = \"{}\"\nmax_retries = 1\n{extra}",
        server.url("/v1"),
        server.url("/feed"),
    );
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = support::settings(dir.path(), &config);
    let client = OpenAiClient::new(&settings.ai).expect("ai client");
    let fetcher = HttpFetcher::new(Duration::from_secs(5)).expect("fetcher");
    TestApp::with(Arc::new(client), Arc::new(fetcher), &config).await
}

#[tokio::test]
async fn run_drafts_matching_stories_once() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/feed");
        then.status(200)
            .header("content-type", "application/rss+xml")
            .body(feed(&server));
    });
    let story_mock = server.mock(|when, then| {
        when.method("GET").path("/newshour/economy/dockworkers-strike");
        then.status(200).body(STORY);
    });
    let ai_mock = server.mock(|when, then| {
        when.method("POST")
            .path("/v1/chat/completions")
            .header("authorization", "Bearer test-key")
            .body_includes("Dockworkers walked off the job at midnight.");
        then.status(200)
            .header("content-type", "application/json")
            .body(completion_body());
    });

    let app = monitor_app(&server, "").await;
    app.context.keywords.add("strike").await.expect("keyword");

    let report = app
        .context
        .monitor
        .run(MonitorTrigger::Manual)
        .await
        .expect("monitor run");
    assert_eq!(report.fetched, 2);
    assert_eq!(report.matched, 1);
    assert_eq!(report.generated.len(), 1);
    assert!(report.failures.is_empty());

    let article = app
        .context
        .articles
        .find_by_id(report.generated[0].article_id)
        .await
        .expect("article");
    assert_eq!(article.status, ArticleStatus::Draft);
    assert!(article.ai_generated);
    assert_eq!(
        article.source_url.as_deref(),
        Some(server.url("/newshour/economy/dockworkers-strike").as_str())
    );
    assert_eq!(
        article.source_title.as_deref(),
        Some("Dockworkers strike at Gulf ports")
    );
    assert_eq!(article.category, Category::Labor);

    let again = app
        .context
        .monitor
        .run(MonitorTrigger::Manual)
        .await
        .expect("second run");
    assert_eq!(again.matched, 1);
    assert_eq!(again.skipped_existing, 1);
    assert!(again.generated.is_empty());

    story_mock.assert();
    ai_mock.assert();
}

#[tokio::test]
async fn candidates_list_matches_without_generating() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/feed");
        then.status(200).body(feed(&server));
    });
    server.mock(|when, then| {
        when.method("POST").path("/v1/chat/completions");
        then.status(200).body(completion_body());
    });

    let app = monitor_app(&server, "").await;
    let token = app.admin_token().await;
    app.json(
        "PUT",
        "/api/admin/monitor/keywords",
        Some(&token),
        Some(json!({ "keywords": ["Ports", "gallery"] })),
    )
    .await;

    let (status, candidates) = app
        .json("GET", "/api/admin/monitor/candidates", Some(&token), None)
        .await;
    assert_eq!(status, 200);
    let candidates = candidates.as_array().expect("array");
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0]["title"], "Dockworkers strike at Gulf ports");
    assert_eq!(candidates[0]["matched_keywords"], json!(["ports"]));
    assert_eq!(candidates[0]["already_processed"], false);
    assert_eq!(candidates[1]["matched_keywords"], json!(["gallery"]));

    let (_, drafts) = app
        .json("GET", "/api/admin/articles", Some(&token), None)
        .await;
    assert_eq!(drafts["total"], 0);
}

#[tokio::test]
async fn generation_failures_are_reported_per_item() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/feed");
        then.status(200).body(feed(&server));
    });
    server.mock(|when, then| {
        when.method("GET").path("/newshour/economy/dockworkers-strike");
        then.status(404);
    });
    server.mock(|when, then| {
        when.method("POST").path("/v1/chat/completions");
        then.status(500).body("upstream exploded");
    });

    let app = monitor_app(&server, "").await;
    let token = app.admin_token().await;
    app.context.keywords.add("strike").await.expect("keyword");

    let (status, report) = app
        .json("POST", "/api/admin/monitor/run", Some(&token), None)
        .await;
    assert_eq!(status, 200, "{report}");
    assert_eq!(report["trigger"], "manual");
    assert_eq!(report["generated"], json!([]));
    assert_eq!(report["failures"].as_array().expect("failures").len(), 1);
    assert_eq!(
        report["failures"][0]["source_title"],
        "Dockworkers strike at Gulf ports"
    );
}

#[tokio::test]
async fn unreachable_feed_is_a_bad_gateway() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/feed");
        then.status(503);
    });

    let app = monitor_app(&server, "").await;
    let token = app.admin_token().await;

    let (status, body) = app
        .json("POST", "/api/admin/monitor/run", Some(&token), None)
        .await;
    assert_eq!(status, 502);
    assert_eq!(body["error"]["code"], "feed_unavailable");
}

#[tokio::test]
async fn no_keywords_means_no_candidates() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/feed");
        then.status(200).body(feed(&server));
    });

    let app = monitor_app(&server, "").await;
    let report = app
        .context
        .monitor
        .run(MonitorTrigger::Schedule)
        .await
        .expect("run");
    assert_eq!(report.fetched, 2);
    assert_eq!(report.matched, 0);
    assert!(report.generated.is_empty());
}

#[tokio::test]
async fn runs_stop_at_the_cap_and_resume_on_the_next_run() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/feed");
        then.status(200).body(strike_feed(&server, 3));
    });
    for n in 1..=3 {
        server.mock(|when, then| {
            when.method("GET").path(format!("/newshour/labor/strike-{n}"));
            then.status(200).body(STORY);
        });
    }

    let config = format!(
        "[monitor]\nfeed_url = \"{}\"\nmax_articles_per_run = 2\nscrape_full_article = false\n",
        server.url("/feed"),
    );
    let client = Arc::new(ScriptedClient::always(REPLY));
    let fetcher = HttpFetcher::new(Duration::from_secs(5)).expect("fetcher");
    let app = TestApp::with(client.clone(), Arc::new(fetcher), &config).await;
    app.context.keywords.add("strike").await.expect("keyword");

    let first = app
        .context
        .monitor
        .run(MonitorTrigger::Manual)
        .await
        .expect("first run");
    assert_eq!(first.matched, 3);
    assert_eq!(first.skipped_existing, 0);
    assert_eq!(first.generated.len(), 2);

    let second = app
        .context
        .monitor
        .run(MonitorTrigger::Manual)
        .await
        .expect("second run");
    assert_eq!(second.matched, 3);
    assert_eq!(second.skipped_existing, 2);
    assert_eq!(second.generated.len(), 1);
    assert_eq!(
        second.generated[0].source_url,
        server.url("/newshour/labor/strike-3")
    );

    let third = app
        .context
        .monitor
        .run(MonitorTrigger::Manual)
        .await
        .expect("third run");
    assert_eq!(third.skipped_existing, 3);
    assert!(third.generated.is_empty());

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 3);
    for (prompt, day) in prompts.iter().zip(1..) {
        assert!(prompt.contains(&format!("Source summary: Picket lines held on day {day}.")));
        assert!(!prompt.contains("Source text:"), "{prompt}");
        assert!(!prompt.contains("Dockworkers walked off the job"));
    }
}

#[tokio::test]
async fn failed_scrape_falls_back_to_the_feed_description() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/feed");
        then.status(200).body(feed(&server));
    });
    let story_mock = server.mock(|when, then| {
        when.method("GET").path("/newshour/economy/dockworkers-strike");
        then.status(404);
    });
    let ai_mock = server.mock(|when, then| {
        when.method("POST")
            .path("/v1/chat/completions")
            .body_includes("Source summary: Ports from Texas to Florida are idle.");
        then.status(200)
            .header("content-type", "application/json")
            .body(completion_body());
    });

    let app = monitor_app(&server, "").await;
    app.context.keywords.add("strike").await.expect("keyword");

    let report = app
        .context
        .monitor
        .run(MonitorTrigger::Manual)
        .await
        .expect("monitor run");
    assert_eq!(report.generated.len(), 1);
    assert!(report.failures.is_empty());

    story_mock.assert();
    ai_mock.assert();
}
