// src/crawl/mod.rs
// =============================================================================
// This module drives the crawl.
//
// Features:
// - Same-domain restriction (never leaves the start URL's host)
// - Depth limit (the start page is depth 0)
// - Each URL fetched at most once, enforced by the dedup ledger's claim
// - One crawl-wide rate limit shared by every fetch
// - Two schedules over the same per-page step:
//     queue: sequential breadth-first, one fetch at a time
//     pool:  bounded number of fetches in flight, fed from a shared queue
// - Cancellation through a CancellationToken
//
// Life of a URL:
//   Discovered -> Claimed -> Fetching -> Recorded | Failed
// =============================================================================

mod pool;
mod queue;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::config::{CrawlConfig, Schedule};
use crate::error::CrawlError;
use crate::extract::LinkExtractor;
use crate::fetch::Fetcher;
use crate::ledger::{DedupLedger, VisitState};
use crate::limiter::RateLimiter;
use crate::sink::{PageResult, ResultSink};

// A page waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: Url,
    pub depth: usize, // How many link hops from the start URL
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub recorded: usize,
    pub failed: usize,
    pub stream_dropped: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct CrawlReport {
    // page URL -> same-domain links found on it
    pub pages: BTreeMap<String, Vec<String>>,
    pub stats: CrawlStats,
    // Why the start URL itself could not be fetched, if it couldn't
    pub start_error: Option<String>,
}

pub struct Crawler {
    config: CrawlConfig,
    fetcher: Fetcher,
    extractor: LinkExtractor,
    ledger: DedupLedger,
    limiter: RateLimiter,
    sink: ResultSink,
    cancel: CancellationToken,
    start_error: OnceLock<String>,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Result<Self, CrawlError> {
        Ok(Self {
            fetcher: Fetcher::new(&config)?,
            extractor: LinkExtractor::new(config.domain()),
            ledger: DedupLedger::new(),
            limiter: RateLimiter::new(config.rate_limit()),
            sink: ResultSink::new(),
            cancel: CancellationToken::new(),
            start_error: OnceLock::new(),
            config,
        })
    }

    // Streams every recorded page to `observer` as well
    pub fn with_observer(mut self, observer: mpsc::Sender<PageResult>) -> Self {
        self.sink = ResultSink::with_observer(observer);
        self
    }

    // Lets the caller abort the crawl by cancelling `cancel`
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    // Runs the crawl to completion (or cancellation)
    pub async fn run(self) -> CrawlReport {
        info!(
            start_url = %self.config.start_url(),
            domain = self.config.domain(),
            max_depth = self.config.max_depth(),
            rate_limit_ms = self.limiter.interval().as_millis() as u64,
            schedule = ?self.config.schedule(),
            "starting crawl"
        );

        let seed = WorkItem {
            url: self.config.start_url().clone(),
            depth: 0,
        };

        match self.config.schedule() {
            Schedule::Sequential => queue::run(&self, seed).await,
            Schedule::Concurrent => pool::run(&self, seed, self.config.workers()).await,
        }

        // Anything still claimed here was cut short by cancellation
        let abandoned = self.ledger.fail_unresolved();
        let stats = CrawlStats {
            recorded: self.ledger.count(VisitState::Recorded),
            failed: self.ledger.count(VisitState::Failed),
            stream_dropped: self.sink.dropped(),
            cancelled: self.cancel.is_cancelled(),
        };

        info!(
            recorded = stats.recorded,
            failed = stats.failed,
            abandoned,
            cancelled = stats.cancelled,
            "crawl finished"
        );

        CrawlReport {
            pages: self.sink.finalize(),
            stats,
            start_error: self.start_error.into_inner(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // Decides whether a work item gets fetched: within depth, and claimed by us
    //
    // Items past the depth limit are dropped before claiming, so a shorter path
    // found later can still claim the same URL
    fn admit(&self, item: &WorkItem) -> bool {
        if item.depth > self.config.max_depth() {
            debug!(url = %item.url, depth = item.depth, "beyond max depth, skipping");
            return false;
        }

        if !self.ledger.try_claim(item.url.as_str()) {
            debug!(url = %item.url, "already claimed, skipping");
            return false;
        }

        true
    }

    // Fetches and records one claimed page, returning its children
    async fn expand(&self, item: WorkItem) -> Vec<WorkItem> {
        let url = item.url.as_str();

        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => {
                self.ledger.resolve(url, VisitState::Failed);
                return Vec::new();
            }
            fetched = async {
                self.limiter.acquire().await;
                info!(url, depth = item.depth, "crawling");
                self.fetcher.fetch(url).await
            } => fetched,
        };

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                if item.depth == 0 {
                    let _ = self.start_error.set(format!("Failed to fetch {}: {}", url, e));
                }
                self.ledger.resolve(url, VisitState::Failed);
                return Vec::new();
            }
        };

        // Recorded under the URL we claimed, resolved against where we landed
        let links = self
            .extractor
            .extract_links(&fetched.body, &fetched.final_url);

        self.sink.record(PageResult {
            page: url.to_string(),
            links: links.iter().map(|link| link.to_string()).collect(),
        });
        self.ledger.resolve(url, VisitState::Recorded);

        links
            .into_iter()
            .map(|link| WorkItem {
                url: link,
                depth: item.depth + 1,
            })
            .collect()
    }
}

// Crawls a website and returns page URL -> links found on that page
//
// Example:
//   max_depth=0: only the start page is fetched (its links are still recorded)
//   max_depth=1: the start page and every page it links to
pub async fn crawl(
    start_url: &str,
    max_depth: usize,
    rate_limit_secs: f64,
) -> Result<BTreeMap<String, Vec<String>>, CrawlError> {
    let config = CrawlConfig::new(start_url)?
        .with_max_depth(max_depth)
        .with_rate_limit(rate_limit_secs);

    Ok(Crawler::new(config)?.run().await.pages)
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why is the claim separate from discovery?
//    - A link can show up on many pages; only the first worker to pop it
//      claims it, everyone else drops their copy
//    - That keeps the queue logic simple: children are always enqueued and
//      the ledger decides
//
// 2. Why does expand() race the fetch against cancellation?
//    - The rate-limit wait and the request are the two places we suspend
//    - If the crawl is cancelled there, the URL is resolved to Failed right
//      away instead of staying Claimed forever
// -----------------------------------------------------------------------------
