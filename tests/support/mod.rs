#![allow(dead_code)]

use std::{
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use peoples_thread::{
    application::{
        generation::{CompletionClient, CompletionRequest, GenerationError},
        monitor::{FetchError, SourceFetcher},
    },
    config::{self, CliArgs, Settings},
    infra::{
        app::ApplicationContext,
        fs::FileStore,
        http::{RouterState, build_router},
        store::Repositories,
    },
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-secret-0123456789abcdef";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

pub const REPLY: &str = r#"{"title": "Nurses vote to strike at county hospital", "excerpt": "Staffing is the central demand.", "body": "Nurses voted on Tuesday.\n\nThe union says staffing is unsafe.", "tags": ["Health Care", "Unions"], "category": "labor"}"#;

/// Settings resolved from a TOML file written into `dir`.
///
/// Retry and item delays are zeroed; keys under an `extra` `[monitor]` table are merged
/// into the same table.
pub fn settings(dir: &Path, extra: &str) -> Settings {
    const MONITOR_DEFAULTS: &str = "retry_delay_ms = 0\nitem_delay_ms = 0\n";
    let extra = if extra.contains("[monitor]\n") {
        extra.replacen("[monitor]\n", &format!("[monitor]\n{MONITOR_DEFAULTS}"), 1)
    } else {
        format!("{extra}\n[monitor]\n{MONITOR_DEFAULTS}")
    };

    let path = dir.join("test-config.toml");
    let toml = format!(
        "[auth]\njwt_secret = \"{JWT_SECRET}\"\n\n[storage]\ndata_dir = \"{}\"\n\n{extra}",
        dir.join("data").display()
    );
    std::fs::write(&path, toml).expect("write config");
    config::load(&CliArgs {
        config_file: Some(path),
        command: None,
    })
    .expect("load settings")
}

/// Completion client that replays scripted answers, then repeats `fallback`.
pub struct ScriptedClient {
    replies: Mutex<Vec<Result<String, GenerationError>>>,
    fallback: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn always(reply: &str) -> Self {
        Self::new(Vec::new(), reply)
    }

    pub fn new(replies: Vec<Result<String, GenerationError>>, fallback: &str) -> Self {
        Self {
            replies: Mutex::new(replies),
            fallback: fallback.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().expect("lock").push(request.prompt);
        let mut replies = self.replies.lock().expect("lock");
        if replies.is_empty() {
            return Ok(self.fallback.clone());
        }
        replies.remove(0)
    }
}

/// Fetcher for tests that never reach the network.
pub struct OfflineFetcher;

#[async_trait]
impl SourceFetcher for OfflineFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        Err(FetchError::Transport {
            url: url.to_string(),
            message: "offline".to_string(),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub context: ApplicationContext,
    pub settings: Settings,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self::with(client, Arc::new(OfflineFetcher), "").await
    }

    pub async fn with(
        client: Arc<dyn CompletionClient>,
        fetcher: Arc<dyn SourceFetcher>,
        extra_config: &str,
    ) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings(dir.path(), extra_config);
        let store = FileStore::open(&settings.storage.data_dir)
            .await
            .expect("file store");
        let context =
            ApplicationContext::new(Repositories::file(store), &settings, client, fetcher);
        context
            .auth
            .bootstrap_admin("admin", ADMIN_PASSWORD)
            .await
            .expect("bootstrap admin");
        let router = build_router(RouterState::new(&context, &settings.rate_limit));

        Self {
            router,
            context,
            settings,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.send(request).await;
        let status = response.status().as_u16();
        let bytes = body_bytes(response).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, 200, "login failed: {body}");
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("utf8 body")
}
