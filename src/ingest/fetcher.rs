//! Network fetch collaborator.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::AppResult;

/// Downloads feed text. Every failure collapses to `None`.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// `reqwest`-backed fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("feedstore/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Fetching {} failed: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Fetching {} returned status {}", url, response.status());
            return None;
        }

        match response.text().await {
            Ok(body) if !body.trim().is_empty() => Some(body),
            Ok(_) => {
                tracing::warn!("Fetching {} returned an empty body", url);
                None
            }
            Err(e) => {
                tracing::warn!("Reading body of {} failed: {}", url, e);
                None
            }
        }
    }
}
