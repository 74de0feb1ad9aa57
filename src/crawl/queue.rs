// src/crawl/queue.rs
// =============================================================================
// Sequential crawling with a breadth-first queue.
//
// How it works:
// 1. Start with the seed in a queue
// 2. Pop the front item, skip it if it's too deep or already claimed
// 3. Fetch it, record its links, push every link to the back at depth + 1
// 4. Repeat until the queue is empty or the crawl is cancelled
//
// One fetch at a time, so the order is fully deterministic: every page at
// depth N is fetched before any page at depth N + 1.
// =============================================================================

use std::collections::VecDeque;

use super::{Crawler, WorkItem};

pub(super) async fn run(crawler: &Crawler, seed: WorkItem) {
    // VecDeque: push_back() adds to end, pop_front() removes from start
    let mut queue = VecDeque::from([seed]);

    while let Some(item) = queue.pop_front() {
        if crawler.is_cancelled() {
            break;
        }

        if !crawler.admit(&item) {
            continue;
        }

        let children = crawler.expand(item).await;
        queue.extend(children);
    }
}
