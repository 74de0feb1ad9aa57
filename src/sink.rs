// src/sink.rs
// =============================================================================
// Where crawl results go.
//
// Two consumers are served at once:
// - Batch: every PageResult is kept in a map, returned by finalize(). This is
//   the record of the crawl.
// - Streaming (optional): every PageResult is also pushed to an observer
//   channel as soon as it is recorded.
//
// Streaming is best effort. We never wait on the observer:
// - channel full   -> this page is dropped from the stream (counted, logged)
// - channel closed -> the observer is detached, the crawl goes on
// =============================================================================

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

// Default capacity for observer channels created by callers of the crawler
pub const OBSERVER_CAPACITY: usize = 1024;

// One successfully fetched page and the same-domain links found on it
//
// Serializes as {"page": "...", "links": [...]}, the live-update message format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    pub page: String,
    pub links: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ResultSink {
    pages: Mutex<BTreeMap<String, Vec<String>>>,
    observer: Mutex<Option<mpsc::Sender<PageResult>>>,
    dropped: AtomicUsize,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: mpsc::Sender<PageResult>) -> Self {
        Self {
            observer: Mutex::new(Some(observer)),
            ..Self::default()
        }
    }

    // Stores a page result and notifies the observer, if any
    pub fn record(&self, result: PageResult) {
        {
            let mut pages = lock(&self.pages);
            pages
                .entry(result.page.clone())
                .or_insert_with(|| result.links.clone());
        }

        self.notify(result);
    }

    fn notify(&self, result: PageResult) {
        let mut observer = lock(&self.observer);
        let Some(tx) = observer.as_ref() else {
            return;
        };

        match tx.try_send(result) {
            Ok(()) => {}
            Err(TrySendError::Full(result)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(page = %result.page, "observer channel full, page dropped from stream");
            }
            Err(TrySendError::Closed(_)) => {
                warn!("observer went away, continuing crawl without live updates");
                *observer = None;
            }
        }
    }

    // Pages that were recorded but could not be streamed
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    // Takes the accumulated page -> links mapping
    pub fn finalize(self) -> BTreeMap<String, Vec<String>> {
        self.pages
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// A panic while holding one of these locks can't leave the map half-written,
// so a poisoned lock is still safe to use
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(page: &str, links: &[&str]) -> PageResult {
        PageResult {
            page: page.to_string(),
            links: links.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_batch_mapping() {
        let sink = ResultSink::new();
        sink.record(result("https://ex.test/", &["https://ex.test/a"]));
        sink.record(result("https://ex.test/a", &[]));

        let pages = sink.finalize();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages["https://ex.test/"], vec!["https://ex.test/a"]);
        assert!(pages["https://ex.test/a"].is_empty());
    }

    #[test]
    fn test_first_record_wins() {
        let sink = ResultSink::new();
        sink.record(result("https://ex.test/", &["https://ex.test/a"]));
        sink.record(result("https://ex.test/", &["https://ex.test/b"]));
        assert_eq!(sink.finalize()["https://ex.test/"], vec!["https://ex.test/a"]);
    }

    #[tokio::test]
    async fn test_observer_receives_each_page() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ResultSink::with_observer(tx);
        sink.record(result("https://ex.test/", &["https://ex.test/a"]));

        let streamed = rx.recv().await.unwrap();
        assert_eq!(streamed, result("https://ex.test/", &["https://ex.test/a"]));
    }

    #[test]
    fn test_full_observer_drops_without_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let sink = ResultSink::with_observer(tx);
        sink.record(result("https://ex.test/1", &[]));
        sink.record(result("https://ex.test/2", &[]));

        assert_eq!(sink.dropped(), 1);
        assert_eq!(sink.finalize().len(), 2);
    }

    #[test]
    fn test_closed_observer_does_not_stop_recording() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let sink = ResultSink::with_observer(tx);
        sink.record(result("https://ex.test/1", &[]));
        sink.record(result("https://ex.test/2", &[]));

        assert_eq!(sink.finalize().len(), 2);
    }

    #[test]
    fn test_page_result_json_shape() {
        let json = serde_json::to_value(result("https://ex.test/", &["https://ex.test/a"])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"page": "https://ex.test/", "links": ["https://ex.test/a"]})
        );
    }
}
