// src/config.rs
// =============================================================================
// Crawl configuration.
//
// A CrawlConfig is built once, before the crawl starts, and never changes
// afterwards. Building it is also where the start URL gets validated:
// - it must parse
// - it must be http or https
// - it must have a host (that host becomes the crawl's domain)
//
// Everything else is plain data with sensible defaults, tweaked through the
// with_* builder methods.
// =============================================================================

use std::time::Duration;

use clap::ValueEnum;
use url::Url;

use crate::error::CrawlError;
use crate::extract::{authority, normalize};

pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_RATE_LIMIT_SECS: f64 = 1.0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; link-mapper/0.1)";

/// How the traversal engine schedules fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Schedule {
    /// One fetch at a time from a FIFO queue (breadth-first)
    Sequential,
    /// A bounded pool of in-flight fetches fed from a shared queue
    #[default]
    Concurrent,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    start_url: Url,
    domain: String,
    max_depth: usize,
    rate_limit: Duration,
    request_timeout: Duration,
    user_agent: String,
    workers: usize,
    schedule: Schedule,
}

impl CrawlConfig {
    // Validates the start URL and derives the crawl domain from it
    pub fn new(start_url: &str) -> Result<Self, CrawlError> {
        let mut start = Url::parse(start_url.trim()).map_err(|source| CrawlError::InvalidUrl {
            url: start_url.to_string(),
            source,
        })?;

        if start.scheme() != "http" && start.scheme() != "https" {
            return Err(CrawlError::UnsupportedScheme {
                url: start_url.to_string(),
                scheme: start.scheme().to_string(),
            });
        }

        let domain =
            authority(&start).ok_or_else(|| CrawlError::MissingHost(start_url.to_string()))?;
        normalize(&mut start);

        Ok(Self {
            start_url: start,
            domain,
            max_depth: DEFAULT_MAX_DEPTH,
            rate_limit: rate_limit_from_secs(DEFAULT_RATE_LIMIT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            workers: DEFAULT_WORKERS,
            schedule: Schedule::default(),
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    // Seconds between two request issuances; zero, negative or NaN values
    // turn the limiter off, anything above a day is capped at a day
    pub fn with_rate_limit(mut self, seconds: f64) -> Self {
        self.rate_limit = rate_limit_from_secs(seconds);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    // At least one worker is always kept
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    /// Host (plus explicit port, if any) every crawled URL must share
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn rate_limit(&self) -> Duration {
        self.rate_limit
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }
}

// Longest pause accepted between two requests
pub const MAX_RATE_LIMIT: Duration = Duration::from_secs(86_400);

fn rate_limit_from_secs(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds)
        .unwrap_or(MAX_RATE_LIMIT)
        .min(MAX_RATE_LIMIT)
}
