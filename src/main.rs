// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging
// 2. Parse command-line arguments using clap
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = crawl done, 1 = start page unreachable,
//    2 = error)
// =============================================================================

mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, Tuning};
use link_mapper::server::{self, ServerSettings};
use link_mapper::{persist, telemetry, CrawlConfig, CrawlReport, Crawler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    telemetry::init_telemetry();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = crawl finished (or server shut down cleanly)
//   Ok(1) = the start URL could not be fetched
//   Err   = anything else
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            start_url,
            max_depth,
            rate_limit,
            tuning,
            output,
            json,
        } => {
            let config = CrawlConfig::new(&start_url)?
                .with_max_depth(max_depth)
                .with_rate_limit(rate_limit);
            handle_crawl(apply_tuning(config, &tuning), output.as_deref(), json).await
        }
        Commands::Serve {
            addr,
            allow_origin,
            max_depth,
            rate_limit,
            tuning,
        } => {
            let settings = ServerSettings {
                max_depth,
                rate_limit_secs: rate_limit,
                request_timeout: Duration::from_secs(tuning.timeout),
                workers: tuning.workers,
                schedule: tuning.schedule,
                user_agent: tuning.user_agent,
                allowed_origins: allow_origin,
            };
            server::serve(&addr, settings).await?;
            Ok(0)
        }
    }
}

fn apply_tuning(config: CrawlConfig, tuning: &Tuning) -> CrawlConfig {
    config
        .with_request_timeout(Duration::from_secs(tuning.timeout))
        .with_workers(tuning.workers)
        .with_schedule(tuning.schedule)
        .with_user_agent(tuning.user_agent.as_str())
}

// Handles the 'crawl' subcommand
async fn handle_crawl(config: CrawlConfig, output: Option<&Path>, json: bool) -> Result<i32> {
    // Ctrl-C stops the crawl but still reports what was found so far
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping crawl");
            on_ctrl_c.cancel();
        }
    });

    let crawler = Crawler::new(config)?.with_cancellation(cancel);
    let report = crawler.run().await;

    if let Some(path) = output {
        persist::write_results(path, &report.pages)
            .with_context(|| format!("Failed to save results to {}", path.display()))?;
        info!(path = %path.display(), pages = report.pages.len(), "results saved");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report.pages)?);
    } else {
        print_table(&report);
    }

    match &report.start_error {
        Some(e) if report.pages.is_empty() => {
            error!("{}", e);
            Ok(1)
        }
        _ => Ok(0),
    }
}

// Prints one line per crawled page, then a summary
fn print_table(report: &CrawlReport) {
    println!("{:<70} {:>6}", "PAGE", "LINKS");
    println!("{}", "=".repeat(77));

    for (page, links) in &report.pages {
        // Truncate URL if too long for display
        let page_display = if page.chars().count() > 67 {
            format!("{}...", page.chars().take(67).collect::<String>())
        } else {
            page.clone()
        };
        println!("{:<70} {:>6}", page_display, links.len());
    }

    println!();
    println!("Summary:");
    println!("   Pages recorded: {}", report.stats.recorded);
    println!("   Pages failed:   {}", report.stats.failed);
    if report.stats.cancelled {
        println!("   (crawl was interrupted)");
    }
}
