// src/error.rs
// =============================================================================
// Error types for the crawler.
//
// Two families:
// - CrawlError: things that stop a crawl before it starts (bad start URL,
//   HTTP client construction) or stop us from saving its results
// - FetchError: why a single page could not be retrieved. These never escape
//   the fetcher as failures of the crawl; the page is just skipped
//
// The binary itself (main.rs, server.rs) uses anyhow::Result on top of these.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("Unsupported scheme '{scheme}' in {url} (only http and https can be crawled)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to write results to {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

// Why a fetch failed. Kept separate from CrawlError because a FetchError is a
// per-page outcome, not a reason to stop
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_connect() {
            FetchError::Connect(error.to_string())
        } else if let Some(status) = error.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Other(error.to_string())
        }
    }
}
