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

//! Optimistic like/follow toggle
//!
//! The flip is applied locally before the network call is fired. While
//! a call is in flight the item refuses further toggles, so N rapid
//! invocations move the count by exactly one step. Reconciliation on
//! failure follows the configured [`RollbackPolicy`].

use std::collections::{HashMap, HashSet};

/// What to do with the optimistic state when the network call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// Revert the local flip, restoring server truth
    #[default]
    Rollback,
    /// Keep the optimistic state; the UI may diverge until the next
    /// full refetch (the original app's behavior)
    Lenient,
}

/// A begun toggle awaiting settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOp {
    /// Engagement state before the flip
    pub was_engaged: bool,
    /// Engagement state after the flip; the direction of the network
    /// call (like vs unlike, follow vs unfollow)
    pub now_engaged: bool,
}

/// Optimistic state of one toggleable item (post like, comment like,
/// user follow)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    /// Whether the viewer currently has the toggle engaged
    pub engaged: bool,
    /// Displayed count
    pub count: u64,
    in_flight: bool,
}

impl ToggleState {
    /// Seed from a displayed snapshot
    pub fn new(engaged: bool, count: u64) -> Self {
        Self {
            engaged,
            count,
            in_flight: false,
        }
    }

    /// Seed from a likes set and the viewing user
    pub fn from_likes(likes: &HashSet<String>, viewer: &str) -> Self {
        Self::new(likes.contains(viewer), likes.len() as u64)
    }

    /// Whether a call is in flight for this item
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Apply the flip locally and mark the item in flight.
    ///
    /// Returns `None` while a previous toggle is unsettled; the caller
    /// must not fire a network call in that case.
    pub fn begin(&mut self) -> Option<ToggleOp> {
        if self.in_flight {
            return None;
        }

        let was_engaged = self.engaged;
        self.engaged = !was_engaged;
        if self.engaged {
            self.count += 1;
        } else {
            self.count = self.count.saturating_sub(1);
        }
        self.in_flight = true;

        Some(ToggleOp {
            was_engaged,
            now_engaged: self.engaged,
        })
    }

    /// Settle a begun toggle with the network outcome
    pub fn settle(&mut self, op: ToggleOp, succeeded: bool, policy: RollbackPolicy) {
        self.in_flight = false;

        if succeeded || policy == RollbackPolicy::Lenient {
            return;
        }

        // Rollback: undo the flip recorded by `op`.
        if self.engaged == op.now_engaged {
            self.engaged = op.was_engaged;
            if op.now_engaged {
                self.count = self.count.saturating_sub(1);
            } else {
                self.count += 1;
            }
        }
    }
}

/// Per-item toggle states, keyed by entity id
#[derive(Debug, Default)]
pub struct ToggleBook {
    states: HashMap<String, ToggleState>,
    policy: RollbackPolicy,
}

impl ToggleBook {
    pub fn new(policy: RollbackPolicy) -> Self {
        Self {
            states: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> RollbackPolicy {
        self.policy
    }

    /// Current state of an item, if tracked
    pub fn get(&self, id: &str) -> Option<&ToggleState> {
        self.states.get(id)
    }

    /// Begin a toggle, seeding from `seed` when the item is untracked
    pub fn begin(&mut self, id: &str, seed: ToggleState) -> Option<(ToggleOp, ToggleState)> {
        let state = self.states.entry(id.to_string()).or_insert(seed);
        state.begin().map(|op| (op, *state))
    }

    /// Settle a begun toggle and return the reconciled state
    pub fn settle(&mut self, id: &str, op: ToggleOp, succeeded: bool) -> Option<ToggleState> {
        let policy = self.policy;
        let state = self.states.get_mut(id)?;
        state.settle(op, succeeded, policy);
        Some(*state)
    }

    /// Drop all tracked state (on logout)
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_applies_before_settlement() {
        let mut state = ToggleState::new(false, 3);

        let op = state.begin().unwrap();
        assert!(state.engaged);
        assert_eq!(state.count, 4);
        assert!(op.now_engaged);
        assert!(state.in_flight());
    }

    #[test]
    fn rapid_toggles_move_count_by_exactly_one() {
        let mut state = ToggleState::new(false, 10);

        let op = state.begin().unwrap();
        // N further invocations while in flight are refused.
        for _ in 0..5 {
            assert!(state.begin().is_none());
        }
        assert_eq!(state.count, 11);

        state.settle(op, true, RollbackPolicy::Rollback);
        assert_eq!(state.count, 11);
        assert!(state.engaged);
    }

    #[test]
    fn rollback_restores_server_truth() {
        let mut state = ToggleState::new(true, 7);

        let op = state.begin().unwrap();
        assert!(!state.engaged);
        assert_eq!(state.count, 6);

        state.settle(op, false, RollbackPolicy::Rollback);
        assert!(state.engaged);
        assert_eq!(state.count, 7);
        assert!(!state.in_flight());
    }

    #[test]
    fn lenient_keeps_the_divergent_state() {
        let mut state = ToggleState::new(false, 0);

        let op = state.begin().unwrap();
        state.settle(op, false, RollbackPolicy::Lenient);

        assert!(state.engaged);
        assert_eq!(state.count, 1);
        // A new toggle is allowed after settlement either way.
        assert!(state.begin().is_some());
    }

    #[test]
    fn count_never_underflows() {
        let mut state = ToggleState::new(true, 0);
        let op = state.begin().unwrap();
        assert_eq!(state.count, 0);
        state.settle(op, false, RollbackPolicy::Rollback);
        assert_eq!(state.count, 1);
    }

    #[test]
    fn seeding_from_likes() {
        let likes: HashSet<String> = ["u1", "u2"].iter().map(|s| s.to_string()).collect();

        let viewer = ToggleState::from_likes(&likes, "u1");
        assert!(viewer.engaged);
        assert_eq!(viewer.count, 2);

        let outsider = ToggleState::from_likes(&likes, "u9");
        assert!(!outsider.engaged);
    }

    #[test]
    fn book_serializes_per_item() {
        let mut book = ToggleBook::new(RollbackPolicy::Rollback);
        let seed = ToggleState::new(false, 2);

        let (op, preview) = book.begin("p1", seed).unwrap();
        assert_eq!(preview.count, 3);

        // Same item: refused while in flight.
        assert!(book.begin("p1", seed).is_none());
        // Different item: independent.
        assert!(book.begin("p2", seed).is_some());

        let settled = book.settle("p1", op, false).unwrap();
        assert_eq!(settled.count, 2);
        assert!(!settled.engaged);
    }
}
