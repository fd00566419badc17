use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::application::monitor::{FetchError, SourceFetcher};

/// Plain HTTP GET fetcher used for the RSS feed and source pages.
#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::Transport {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self { http })
    }
}

pub fn user_agent() -> &'static str {
    concat!("PeoplesThreadMonitor/", env!("CARGO_PKG_VERSION"))
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let transport = |err: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        };

        let response = self.http.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(transport)
    }
}
