// src/lib.rs
// =============================================================================
// link-mapper: maps the internal link graph of a single website.
//
// Given a start URL, it visits every page on the same host that can be reached
// within a maximum number of link hops, and reports, for each page, the
// same-host links found on it.
//
// Modules, leaves first:
// - fetch:    downloads one page (timeout, User-Agent, failure handling)
// - extract:  finds same-domain links in a page's HTML
// - ledger:   which URLs have been claimed, and how each one ended
// - limiter:  crawl-wide pacing of requests
// - sink:     collects results and streams them to an optional observer
// - crawl:    the traversal engine (sequential queue or worker pool)
// - persist:  saves results as a JSON file
// - server:   WebSocket endpoint with live updates
// =============================================================================

pub mod config;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ledger;
pub mod limiter;
pub mod persist;
pub mod server;
pub mod sink;
pub mod telemetry;

pub use config::{CrawlConfig, Schedule};
pub use crawl::{crawl, CrawlReport, CrawlStats, Crawler, WorkItem};
pub use error::{CrawlError, FetchError};
pub use sink::PageResult;
