use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use mockall::automock;
use tracing::{debug, error};

use crate::server::error::{AppResult, Error};

pub type DynPageFetcher = Arc<dyn PageFetcherTrait + Send + Sync>;

#[automock]
#[async_trait]
pub trait PageFetcherTrait {
    /// raw html of the page, any transport error or non 2xx status is `Error::FetchFailed`
    async fn fetch(&self, url: &str) -> AppResult<String>;
}

pub struct PageFetcher {
    http_client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        // the episode site 403s anything without a browser-ish user agent
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("failed to build the page fetch client")?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl PageFetcherTrait for PageFetcher {
    async fn fetch(&self, url: &str) -> AppResult<String> {
        debug!("fetching episode page: {}", url);

        let response = self
            .http_client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,*/*;q=0.8")
            .header("Accept-Language", "es-ES,es;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|e| {
                error!("failed to fetch {}: {}", url, e);
                Error::FetchFailed {
                    status: e.status().map(|s| s.as_u16()),
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("episode page {} returned status: {}", url, status);
            return Err(Error::FetchFailed {
                status: Some(status.as_u16()),
                message: format!("upstream returned {}", status),
            });
        }

        response.text().await.map_err(|e| {
            error!("failed to read episode page body: {}", e);
            Error::FetchFailed {
                status: Some(status.as_u16()),
                message: format!("failed to read response body: {}", e),
            }
        })
    }
}
