// src/crawl/pool.rs
// =============================================================================
// Concurrent crawling with a bounded pool of in-flight fetches.
//
// The crawl advances one depth level at a time:
// - every item of the current level is fed into the pool
// - at most `workers` fetches run at once, however many links a page has
// - children found along the way are collected for the next level
// - the next level starts once the current one has fully drained
//
// Because all items of one level share the same depth, a URL is always
// claimed through its shortest discovery path.
//
// The ledger's atomic claim is the only point where workers coordinate.
// =============================================================================

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::debug;

use super::{Crawler, WorkItem};

pub(super) async fn run(crawler: &Crawler, seed: WorkItem, workers: usize) {
    let mut level = vec![seed];
    let mut depth = 0;

    while !level.is_empty() {
        debug!(depth, items = level.len(), "starting crawl level");

        let mut pending = level.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut next_level = Vec::new();

        loop {
            // Top the pool up
            while in_flight.len() < workers {
                let Some(item) = pending.next() else { break };
                if crawler.admit(&item) {
                    in_flight.push(crawler.expand(item));
                }
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                _ = crawler.cancel.cancelled() => return,
                Some(children) = in_flight.next() => next_level.extend(children),
            }
        }

        level = next_level;
        depth += 1;
    }
}
