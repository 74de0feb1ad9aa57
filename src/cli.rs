// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - crawl: crawl a site once, print a summary (or JSON), optionally save it
// - serve: run the WebSocket server that streams crawls live
//
// Every flag can also be set through a LINK_MAPPER_* environment variable.
// =============================================================================

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use link_mapper::config::{
    DEFAULT_MAX_DEPTH, DEFAULT_RATE_LIMIT_SECS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
    DEFAULT_WORKERS,
};
use link_mapper::server::DEFAULT_SERVER_MAX_DEPTH;
use link_mapper::Schedule;

#[derive(Parser, Debug)]
#[command(
    name = "link-mapper",
    version,
    about = "Map the internal link graph of a website",
    long_about = "link-mapper crawls a website from a start URL, stays on the same host, \
                  and records which internal pages link to which."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a website and report its internal links
    ///
    /// Example: link-mapper crawl https://example.com --max-depth 2 --output links.json
    Crawl {
        /// URL to start crawling from (e.g., https://example.com)
        start_url: String,

        /// Maximum crawl depth (0 = only the start page)
        #[arg(long, env = "LINK_MAPPER_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Seconds between two requests, across the whole crawl (0 disables)
        #[arg(long, env = "LINK_MAPPER_RATE_LIMIT", default_value_t = DEFAULT_RATE_LIMIT_SECS)]
        rate_limit: f64,

        #[command(flatten)]
        tuning: Tuning,

        /// Write the page -> links mapping to this JSON file
        #[arg(long, short, env = "LINK_MAPPER_OUTPUT")]
        output: Option<PathBuf>,

        /// Print the page -> links mapping as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Serve live crawls over a WebSocket at /ws
    Serve {
        /// Address to listen on
        #[arg(long, env = "LINK_MAPPER_ADDR", default_value = "0.0.0.0:8000")]
        addr: String,

        /// Origins allowed by CORS (repeat or comma separate)
        #[arg(
            long,
            env = "LINK_MAPPER_ALLOW_ORIGIN",
            value_delimiter = ',',
            default_value = "http://localhost:8080"
        )]
        allow_origin: Vec<String>,

        /// Maximum crawl depth for each session
        #[arg(long, env = "LINK_MAPPER_MAX_DEPTH", default_value_t = DEFAULT_SERVER_MAX_DEPTH)]
        max_depth: usize,

        /// Seconds between two requests within a session (0 disables)
        #[arg(long, env = "LINK_MAPPER_RATE_LIMIT", default_value_t = DEFAULT_RATE_LIMIT_SECS)]
        rate_limit: f64,

        #[command(flatten)]
        tuning: Tuning,
    },
}

// Knobs shared by both subcommands
#[derive(clap::Args, Debug, Clone)]
pub struct Tuning {
    /// Per-request timeout in seconds
    #[arg(long, env = "LINK_MAPPER_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Maximum number of fetches in flight (concurrent schedule)
    #[arg(long, env = "LINK_MAPPER_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// User-Agent header sent with every request
    #[arg(long, env = "LINK_MAPPER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// How fetches are scheduled
    #[arg(long, env = "LINK_MAPPER_SCHEDULE", value_enum, default_value_t = Schedule::Concurrent)]
    pub schedule: Schedule,
}
