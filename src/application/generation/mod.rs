//! AI article drafting: completion client seam, retry loop and response parsing.

mod parse;
mod prompt;

pub use parse::{derive_excerpt, parse_generated};
pub use prompt::{ResponsePrompt, SYSTEM_PROMPT, TopicPrompt};

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::{domain::categories::Category, infra::telemetry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("AI completion service is not configured")]
    NotConfigured,
    #[error("AI service responded with status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("AI request failed: {0}")]
    Transport(String),
    #[error("AI response was not a usable article: {0}")]
    Parse(String),
    #[error("AI response contained no content")]
    Empty,
}

impl GenerationError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotConfigured)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Upstream { .. } => "upstream",
            Self::Transport(_) => "transport",
            Self::Parse(_) => "parse",
            Self::Empty => "empty",
        }
    }
}

/// Chat-style completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError>;
}

/// Article fields extracted from a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArticle {
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub tags: Vec<String>,
    pub category: Category,
}

/// Linear retry: attempt `n` failing waits `delay * n` before attempt `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay.saturating_mul(attempt)
    }
}

pub struct ArticleGenerator {
    client: Arc<dyn CompletionClient>,
    max_tokens: u32,
    temperature: f32,
}

impl ArticleGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            client,
            max_tokens,
            temperature,
        }
    }

    fn request(&self, prompt: String) -> CompletionRequest {
        CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Single attempt: complete and parse.
    pub async fn generate(
        &self,
        prompt: &str,
        fallback: Category,
    ) -> Result<GeneratedArticle, GenerationError> {
        let started = Instant::now();
        let text = self.client.complete(self.request(prompt.to_string())).await?;
        let article = parse_generated(&text, fallback)?;
        metrics::histogram!(telemetry::METRIC_GENERATION_MS)
            .record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(article)
    }

    pub async fn generate_with_retry(
        &self,
        prompt: &str,
        fallback: Category,
        retry: RetryPolicy,
    ) -> Result<GeneratedArticle, GenerationError> {
        let mut attempt = 1;
        loop {
            match self.generate(prompt, fallback).await {
                Ok(article) => {
                    debug!(
                        target = "peoples_thread::application::generation",
                        attempt,
                        title = %article.title,
                        "completion parsed"
                    );
                    return Ok(article);
                }
                Err(err) => {
                    metrics::counter!(telemetry::METRIC_GENERATION_FAILURES, "kind" => err.kind())
                        .increment(1);
                    if !err.is_retryable() || attempt >= retry.max_attempts {
                        return Err(err);
                    }
                    let wait = retry.backoff(attempt);
                    warn!(
                        target = "peoples_thread::application::generation",
                        attempt,
                        max_attempts = retry.max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "completion failed, retrying"
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct ScriptedClient {
        replies: Mutex<Vec<Result<String, GenerationError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedClient {
        fn new(mut replies: Vec<Result<String, GenerationError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("lock")
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, GenerationError> {
            *self.calls.lock().expect("lock") += 1;
            self.replies
                .lock()
                .expect("lock")
                .pop()
                .unwrap_or(Err(GenerationError::Empty))
        }
    }

    const ARTICLE_JSON: &str = r#"{"title":"Nurses walk out","body":"Nurses walked out today.","tags":["health"]}"#;

    #[tokio::test]
    async fn retries_until_success() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(GenerationError::Upstream {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            Ok("not json".to_string()),
            Ok(ARTICLE_JSON.to_string()),
        ]));
        let generator = ArticleGenerator::new(client.clone(), 500, 0.5);

        let article = generator
            .generate_with_retry(
                "prompt",
                Category::Labor,
                RetryPolicy::new(3, Duration::from_millis(10)),
            )
            .await
            .expect("article");

        assert_eq!(article.title, "Nurses walk out");
        assert_eq!(article.category, Category::Labor);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(GenerationError::transport("reset")),
            Err(GenerationError::transport("reset")),
            Ok(ARTICLE_JSON.to_string()),
        ]));
        let generator = ArticleGenerator::new(client.clone(), 500, 0.5);

        let err = generator
            .generate_with_retry(
                "prompt",
                Category::World,
                RetryPolicy::new(2, Duration::from_millis(10)),
            )
            .await
            .expect_err("budget exhausted");

        assert!(matches!(err, GenerationError::Transport(_)));
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn not_configured_is_not_retried() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(GenerationError::NotConfigured),
            Ok(ARTICLE_JSON.to_string()),
        ]));
        let generator = ArticleGenerator::new(client.clone(), 500, 0.5);

        let err = generator
            .generate_with_retry(
                "prompt",
                Category::World,
                RetryPolicy::new(5, Duration::from_secs(60)),
            )
            .await
            .expect_err("not configured");

        assert!(matches!(err, GenerationError::NotConfigured));
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn backoff_is_linear() {
        let policy = RetryPolicy::new(3, Duration::from_millis(250));
        assert_eq!(policy.backoff(1), Duration::from_millis(250));
        assert_eq!(policy.backoff(2), Duration::from_millis(500));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
