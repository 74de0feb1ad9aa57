// src/ledger.rs
// =============================================================================
// The dedup ledger: which URLs this crawl has already taken on.
//
// A URL is claimed at the moment a worker accepts it for fetching, not when it
// is first seen in a page. The claim is a single atomic check-and-insert, so
// two workers racing on the same URL can never both win.
//
// Every claimed URL ends up in one of two terminal states:
// - Recorded: fetched, parsed, result stored
// - Failed: fetch failed, or the crawl was cancelled while it was in flight
// =============================================================================

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Claimed,
    Recorded,
    Failed,
}

#[derive(Debug, Default)]
pub struct DedupLedger {
    states: DashMap<String, VisitState>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // Returns true if the caller now owns crawling `url`
    pub fn try_claim(&self, url: &str) -> bool {
        match self.states.entry(url.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(VisitState::Claimed);
                true
            }
        }
    }

    // Moves a claimed URL to its terminal state. Unclaimed URLs are ignored
    pub fn resolve(&self, url: &str, outcome: VisitState) {
        if let Some(mut state) = self.states.get_mut(url) {
            if *state == VisitState::Claimed {
                *state = outcome;
            }
        }
    }

    // Marks every URL still in flight as Failed; returns how many there were
    pub fn fail_unresolved(&self) -> usize {
        let mut failed = 0;
        for mut state in self.states.iter_mut() {
            if *state.value() == VisitState::Claimed {
                *state.value_mut() = VisitState::Failed;
                failed += 1;
            }
        }
        failed
    }

    pub fn count(&self, wanted: VisitState) -> usize {
        self.states.iter().filter(|s| *s.value() == wanted).count()
    }
}
