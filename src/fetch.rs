// src/fetch.rs
// =============================================================================
// This module downloads pages.
//
// Key functionality:
// - One GET per page, with a fixed timeout and User-Agent
// - Anything other than a 2xx response is a failure
// - Failures are logged here and handed back as a FetchError value; the
//   engine treats them as "no result for this page", so one dead or slow
//   page never stops the crawl
//
// The reqwest Client is built once per crawl and shared (it is a cheap,
// reference-counted handle around a connection pool).
// =============================================================================

use reqwest::Client;
use tracing::warn;
use url::Url;

use crate::config::CrawlConfig;
use crate::error::{CrawlError, FetchError};

// A downloaded page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    // Where the body actually came from, after any redirects. Relative links
    // in the body resolve against this, not against the requested URL
    pub final_url: Url,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent())
            // No more idle connections than we can have fetches in flight
            .pool_max_idle_per_host(config.workers())
            .build()?;

        Ok(Self { client })
    }

    // Fetches a page body. Every failure is logged before it is returned
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let result = self.get(url).await;
        if let Err(e) = &result {
            warn!(url, error = %e, "failed to fetch page");
        }
        result
    }

    async fn get(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let body = response.text().await?;
        Ok(FetchedPage { final_url, body })
    }
}
