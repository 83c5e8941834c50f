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

//! Viewport sentinel gate
//!
//! The UI shell reports the sentinel element's visibility ratio; this
//! gate decides whether that report should advance the feed. The
//! `initial_load_done` condition closes the race where the sentinel is
//! visible before any content exists.

use super::FeedState;

/// Default visibility threshold: the sentinel must be fully visible
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Gate between visibility reports and page-fetch triggers
#[derive(Debug, Clone)]
pub struct Sentinel {
    threshold: f64,
    attached: bool,
}

impl Sentinel {
    /// Create an attached sentinel with the default threshold
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_THRESHOLD)
    }

    /// Create an attached sentinel with a custom threshold
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            attached: true,
        }
    }

    /// Whether the sentinel is still observing
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Release the observation. Called when the owning view unmounts
    /// or the sentinel element changes identity; a detached sentinel
    /// never fires again.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Decide whether a visibility report should trigger the next page
    pub fn should_fire(&self, visibility: f64, feed: &FeedState) -> bool {
        self.attached
            && visibility >= self.threshold
            && feed.has_more
            && !feed.is_loading
            && feed.initial_load_done
    }
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_state() -> FeedState {
        FeedState {
            has_more: true,
            is_loading: false,
            initial_load_done: true,
            len: 10,
        }
    }

    #[test]
    fn fires_only_when_fully_visible() {
        let sentinel = Sentinel::new();
        let state = ready_state();

        assert!(sentinel.should_fire(1.0, &state));
        assert!(!sentinel.should_fire(0.99, &state));
        assert!(!sentinel.should_fire(0.0, &state));
    }

    #[test]
    fn gated_until_first_page_resolves() {
        let sentinel = Sentinel::new();
        let state = FeedState {
            initial_load_done: false,
            len: 0,
            ..ready_state()
        };

        // Visible before any content exists: do not fire.
        assert!(!sentinel.should_fire(1.0, &state));
    }

    #[test]
    fn respects_loading_and_exhaustion() {
        let sentinel = Sentinel::new();

        let loading = FeedState {
            is_loading: true,
            ..ready_state()
        };
        assert!(!sentinel.should_fire(1.0, &loading));

        let exhausted = FeedState {
            has_more: false,
            ..ready_state()
        };
        assert!(!sentinel.should_fire(1.0, &exhausted));
    }

    #[test]
    fn detached_sentinel_never_fires() {
        let mut sentinel = Sentinel::new();
        let state = ready_state();

        assert!(sentinel.should_fire(1.0, &state));
        sentinel.detach();
        assert!(!sentinel.should_fire(1.0, &state));
        assert!(!sentinel.is_attached());
    }
}
