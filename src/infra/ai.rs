//! OpenAI-compatible chat completion client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    application::generation::{CompletionClient, CompletionRequest, GenerationError},
    config::AiSettings,
};

const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn new(settings: &AiSettings) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(GenerationError::transport)?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", settings.base_url),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

pub fn user_agent() -> &'static str {
    concat!("PeoplesThread/", env!("CARGO_PKG_VERSION"))
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::NotConfigured)?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::parse(format!("invalid completion payload: {err}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(GenerationError::Empty)?;

        debug!(
            target = "peoples_thread::infra::ai",
            model = %self.model,
            chars = content.len(),
            "completion received"
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::MockServer;

    use super::*;

    fn settings(base_url: String, api_key: Option<&str>) -> AiSettings {
        AiSettings {
            base_url,
            api_key: api_key.map(str::to_string),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
            max_tokens: 100,
            temperature: 0.2,
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "system".to_string(),
            prompt: "prompt".to_string(),
            max_tokens: 100,
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body_includes(r#"{"model":"test-model","max_tokens":100}"#);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"choices":[{"message":{"role":"assistant","content":" {\"title\":\"T\"} "}}]}"#);
        });

        let client =
            OpenAiClient::new(&settings(server.url("/v1"), Some("sk-test"))).expect("client");
        let content = client.complete(request()).await.expect("content");

        mock.assert();
        assert_eq!(content, "{\"title\":\"T\"}");
    }

    #[tokio::test]
    async fn upstream_errors_keep_truncated_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/chat/completions");
            then.status(429).body("x".repeat(2000));
        });

        let client =
            OpenAiClient::new(&settings(server.base_url(), Some("sk-test"))).expect("client");
        let err = client.complete(request()).await.expect_err("rate limited");

        match err {
            GenerationError::Upstream { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body.len(), ERROR_BODY_LIMIT);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        let client = OpenAiClient::new(&settings("http://127.0.0.1:9".to_string(), None))
            .expect("client");
        assert!(matches!(
            client.complete(request()).await,
            Err(GenerationError::NotConfigured)
        ));
    }
}
