// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciles link state and backend reachability into one status.
//!
//! Rules, evaluated on every input:
//! 1. Link down → `Offline`, whatever the last probe said
//! 2. Link up and backend reachable → `OnlineReachable`
//! 3. Link up and backend unreachable or indeterminate → `OnlineUnreachable`
//!
//! A link-up edge starts a new link epoch and discards the previous
//! reachability reading, which was taken over a different path. Probe results
//! carry the epoch they were issued in so late answers from a previous epoch
//! cannot leak into the new one.

use crate::status::{ConnectivityStatus, Reachability};

/// A change of published status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectivityStatus,
    pub to: ConnectivityStatus,
}

impl Transition {
    pub fn entered_reachable(&self) -> bool {
        self.to.is_reachable() && !self.from.is_reachable()
    }

    pub fn left_reachable(&self) -> bool {
        self.from.is_reachable() && !self.to.is_reachable()
    }
}

/// The single writer of `ConnectivityStatus`.
#[derive(Debug, Clone)]
pub struct ConnectivityReconciler {
    link_up: bool,
    reachability: Reachability,
    epoch: u64,
    status: ConnectivityStatus,
}

impl Default for ConnectivityReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityReconciler {
    /// Starts offline with no reachability reading.
    pub fn new() -> Self {
        ConnectivityReconciler {
            link_up: false,
            reachability: Reachability::Indeterminate,
            epoch: 0,
            status: ConnectivityStatus::Offline,
        }
    }

    /// The status implied by a `(link_up, reachability)` pair.
    pub fn derive(link_up: bool, reachability: Reachability) -> ConnectivityStatus {
        match (link_up, reachability) {
            (false, _) => ConnectivityStatus::Offline,
            (true, Reachability::Reachable) => ConnectivityStatus::OnlineReachable,
            (true, Reachability::Unreachable | Reachability::Indeterminate) => {
                ConnectivityStatus::OnlineUnreachable
            }
        }
    }

    pub fn status(&self) -> ConnectivityStatus {
        self.status
    }

    pub fn link_up(&self) -> bool {
        self.link_up
    }

    pub fn reachability(&self) -> Reachability {
        self.reachability
    }

    /// Identifies the current link-up period. Probes should be tagged with it.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Probing is only worthwhile while a link exists.
    pub fn should_probe(&self) -> bool {
        self.link_up
    }

    /// Apply a link-state event.
    pub fn on_link(&mut self, up: bool) -> Option<Transition> {
        if up && !self.link_up {
            self.epoch = self.epoch.wrapping_add(1);
            self.reachability = Reachability::Indeterminate;
        }
        self.link_up = up;
        self.recompute()
    }

    /// Apply a probe result issued during the current epoch.
    pub fn on_probe(&mut self, reachability: Reachability) -> Option<Transition> {
        self.reachability = reachability;
        self.recompute()
    }

    /// Apply a probe result tagged with the epoch it was issued in.
    ///
    /// Results from an earlier epoch, or arriving while the link is down,
    /// are dropped.
    pub fn on_probe_for(&mut self, epoch: u64, reachability: Reachability) -> Option<Transition> {
        if epoch != self.epoch || !self.link_up {
            tracing::debug!(epoch, current = self.epoch, "dropping stale probe result");
            return None;
        }
        self.on_probe(reachability)
    }

    /// A caller observed a connectivity failure against the backend.
    ///
    /// Only demotes a `Reachable` reading; other readings already say as much.
    pub fn mark_suspect(&mut self) -> Option<Transition> {
        if self.link_up && self.reachability == Reachability::Reachable {
            self.reachability = Reachability::Unreachable;
        }
        self.recompute()
    }

    fn recompute(&mut self) -> Option<Transition> {
        let next = Self::derive(self.link_up, self.reachability);
        if next == self.status {
            return None;
        }
        let transition = Transition { from: self.status, to: next };
        self.status = next;
        Some(transition)
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
