// Ripple - a social feed client core
// Copyright (C) 2026 Ripple Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Feed pagination engine
//!
//! One loader instance per on-screen feed. The loader owns the page
//! cursor, deduplicates against already-loaded items, and decides
//! exhaustion from raw page length alone. Exactly one fetch may be in
//! flight per instance; the `is_loading` flag is a mandatory
//! mutual-exclusion guard, not a hint.

mod sentinel;
mod source;
mod thread;
mod toggle;

pub use sentinel::Sentinel;
pub use source::{BackendSource, FeedEntry, FeedKind};
pub use thread::CommentThread;
pub use toggle::{RollbackPolicy, ToggleBook, ToggleState};

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::api::ApiError;

/// An item addressable by a stable unique id
pub trait FeedKey {
    fn key(&self) -> &str;
}

/// A source of fixed-size pages, 1-based
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch(&self, page: u32, limit: u32) -> Result<Vec<T>, ApiError>;
}

/// Snapshot of loader state, consumed by the viewport sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedState {
    pub has_more: bool,
    pub is_loading: bool,
    pub initial_load_done: bool,
    pub len: usize,
}

/// Result of a `fetch_next_page` call
#[derive(Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page resolved; `added` items survived dedup and were appended
    Appended { added: usize },
    /// A fetch is already in flight; state untouched
    Busy,
    /// Pagination already ended; no request was made
    Exhausted,
    /// The request failed; state untouched, the same trigger can retry
    Failed { unauthorized: bool },
}

/// Paginated, append-only accumulation of feed items
pub struct FeedLoader<T, S> {
    source: S,
    items: Vec<T>,
    seen: HashSet<String>,
    page: u32,
    limit: u32,
    has_more: bool,
    is_loading: bool,
    initial_load_done: bool,
}

impl<T: FeedKey, S: PageSource<T>> FeedLoader<T, S> {
    /// Create a loader over a source with a fixed page size
    pub fn new(source: S, limit: u32) -> Self {
        Self {
            source,
            items: Vec::new(),
            seen: HashSet::new(),
            page: 1,
            limit,
            has_more: true,
            is_loading: false,
            initial_load_done: false,
        }
    }

    /// Accumulated items, in append order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Fixed page size
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Current state snapshot
    pub fn state(&self) -> FeedState {
        FeedState {
            has_more: self.has_more,
            is_loading: self.is_loading,
            initial_load_done: self.initial_load_done,
            len: self.items.len(),
        }
    }

    /// Fetch and merge the next page.
    ///
    /// Exhaustion is decided by raw page length only: a page shorter
    /// than the limit (or empty) ends pagination; a full page of
    /// duplicates does not. On failure nothing changes, so the same
    /// trigger can retry.
    pub async fn fetch_next_page(&mut self) -> FetchOutcome {
        if self.is_loading {
            return FetchOutcome::Busy;
        }
        if !self.has_more {
            return FetchOutcome::Exhausted;
        }

        self.is_loading = true;
        let result = self.source.fetch(self.page, self.limit).await;
        self.is_loading = false;

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("Feed page {} fetch failed: {}", self.page, e);
                return FetchOutcome::Failed {
                    unauthorized: e.is_unauthorized(),
                };
            }
        };

        let raw_len = fetched.len();
        let mut added = 0;
        for item in fetched {
            if self.seen.insert(item.key().to_string()) {
                self.items.push(item);
                added += 1;
            }
        }

        if raw_len < self.limit as usize {
            self.has_more = false;
        }

        self.page += 1;
        self.initial_load_done = true;

        debug!(
            "Feed page advanced: raw={} added={} total={} has_more={}",
            raw_len,
            added,
            self.items.len(),
            self.has_more
        );

        FetchOutcome::Appended { added }
    }

    #[cfg(test)]
    pub(crate) fn force_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Item(pub String);

    impl FeedKey for Item {
        fn key(&self) -> &str {
            &self.0
        }
    }

    /// Scripted page source: a queue of pages or failures
    pub struct ScriptedSource {
        pages: Mutex<Vec<Result<Vec<Item>, ()>>>,
    }

    impl ScriptedSource {
        pub fn new(pages: Vec<Result<Vec<&str>, ()>>) -> Self {
            let pages = pages
                .into_iter()
                .map(|p| p.map(|ids| ids.into_iter().map(|s| Item(s.to_string())).collect()))
                .collect();
            Self {
                pages: Mutex::new(pages),
            }
        }
    }

    #[async_trait]
    impl PageSource<Item> for ScriptedSource {
        async fn fetch(&self, _page: u32, _limit: u32) -> Result<Vec<Item>, ApiError> {
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                return Ok(Vec::new());
            }
            pages.remove(0).map_err(|_| ApiError::Backend {
                status: 500,
                message: "scripted failure".to_string(),
            })
        }
    }

    fn keys<T: FeedKey>(items: &[T]) -> Vec<&str> {
        items.iter().map(|i| i.key()).collect()
    }

    #[tokio::test]
    async fn overlapping_pages_never_duplicate() {
        let source = ScriptedSource::new(vec![
            Ok(vec!["a", "b"]),
            Ok(vec!["b", "c"]),
            Ok(vec!["c"]),
        ]);
        let mut feed = FeedLoader::new(source, 2);

        assert_eq!(feed.fetch_next_page().await, FetchOutcome::Appended { added: 2 });
        assert_eq!(feed.fetch_next_page().await, FetchOutcome::Appended { added: 1 });
        assert_eq!(keys(feed.items()), vec!["a", "b", "c"]);

        // Short page ends pagination; earlier items are untouched.
        assert_eq!(feed.fetch_next_page().await, FetchOutcome::Appended { added: 0 });
        assert_eq!(keys(feed.items()), vec!["a", "b", "c"]);
        assert!(!feed.state().has_more);
    }

    #[tokio::test]
    async fn full_page_of_duplicates_does_not_end_pagination() {
        let source = ScriptedSource::new(vec![
            Ok(vec!["a", "b"]),
            Ok(vec!["a", "b"]),
            Ok(vec!["c", "d"]),
        ]);
        let mut feed = FeedLoader::new(source, 2);

        feed.fetch_next_page().await;
        assert_eq!(feed.fetch_next_page().await, FetchOutcome::Appended { added: 0 });
        // Zero new items but a full raw page: keep going.
        assert!(feed.state().has_more);

        feed.fetch_next_page().await;
        assert_eq!(keys(feed.items()), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn exhaustion_is_exactly_short_page() {
        let source = ScriptedSource::new(vec![Ok(vec!["a", "b", "c"]), Ok(vec![])]);
        let mut feed = FeedLoader::new(source, 3);

        feed.fetch_next_page().await;
        // Full page: not exhausted yet.
        assert!(feed.state().has_more);

        feed.fetch_next_page().await;
        assert!(!feed.state().has_more);

        // Further calls never reach the source.
        assert_eq!(feed.fetch_next_page().await, FetchOutcome::Exhausted);
    }

    #[tokio::test]
    async fn failure_leaves_state_unchanged_and_retryable() {
        let source = ScriptedSource::new(vec![
            Ok(vec!["a", "b"]),
            Err(()),
            Ok(vec!["c", "d"]),
        ]);
        let mut feed = FeedLoader::new(source, 2);

        feed.fetch_next_page().await;
        let before = feed.state();

        assert_eq!(
            feed.fetch_next_page().await,
            FetchOutcome::Failed {
                unauthorized: false
            }
        );
        assert_eq!(feed.state(), before);
        assert_eq!(keys(feed.items()), vec!["a", "b"]);

        // Same trigger retries the same page.
        assert_eq!(feed.fetch_next_page().await, FetchOutcome::Appended { added: 2 });
        assert_eq!(keys(feed.items()), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn initial_load_gate_opens_after_first_success() {
        let source = ScriptedSource::new(vec![Err(()), Ok(vec!["a"])]);
        let mut feed = FeedLoader::new(source, 2);

        assert!(!feed.state().initial_load_done);
        feed.fetch_next_page().await;
        assert!(!feed.state().initial_load_done);
        feed.fetch_next_page().await;
        assert!(feed.state().initial_load_done);
    }

    #[tokio::test]
    async fn in_flight_fetch_refuses_reentry() {
        let source = ScriptedSource::new(vec![Ok(vec!["a", "b"])]);
        let mut feed = FeedLoader::new(source, 2);

        feed.force_loading(true);
        assert_eq!(feed.fetch_next_page().await, FetchOutcome::Busy);
        assert_eq!(feed.items().len(), 0);

        feed.force_loading(false);
        assert_eq!(feed.fetch_next_page().await, FetchOutcome::Appended { added: 2 });
    }

    #[tokio::test]
    async fn end_to_end_two_item_feed() {
        // Page 1 returns 2 items at page size 2, page 2 returns none.
        let source = ScriptedSource::new(vec![Ok(vec!["p1", "p2"]), Ok(vec![])]);
        let mut feed = FeedLoader::new(source, 2);

        feed.fetch_next_page().await;
        assert!(feed.state().has_more);
        assert_eq!(feed.items().len(), 2);

        feed.fetch_next_page().await;
        assert!(!feed.state().has_more);
        assert_eq!(feed.items().len(), 2);
    }
}
