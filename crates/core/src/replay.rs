// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Replay bookkeeping: drain sessions, outcome classification, retry policy.
//!
//! The async driver in `morsel-agent` owns the queue and a session, invokes
//! one handler at a time, and feeds each outcome through
//! [`ReplayPolicy::judge`] to learn what to do next.
//!
//! ```text
//!            OnlineReachable && !queue.is_empty()
//!   ┌──────┐ ──────────────────────────────────► ┌──────────┐
//!   │ Idle │                                     │ Draining │
//!   └──────┘ ◄────────────────────────────────── └──────────┘
//!       ▲       exhausted / connectivity failure       │
//!       │                                              │ left OnlineReachable
//!       │            ┌───────────┐                     │ or queue cleared
//!       └─────────── │ Cancelled │ ◄───────────────────┘
//!     in-flight done └───────────┘
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::ActionId;

/// Why a replay attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// No link, backend unreachable, or timed out. Not the action's fault.
    Connectivity,
    /// The backend is up but refused for now (5xx, rate limit).
    Transient,
    /// The backend rejected the action itself (validation, conflict).
    Permanent,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureClass::Connectivity => "connectivity",
            FailureClass::Transient => "transient",
            FailureClass::Permanent => "permanent",
        };
        write!(f, "{s}")
    }
}

/// What a replay handler reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    Succeeded,
    Failed { class: FailureClass, reason: String },
}

impl ReplayOutcome {
    pub fn connectivity(reason: impl Into<String>) -> Self {
        ReplayOutcome::Failed { class: FailureClass::Connectivity, reason: reason.into() }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        ReplayOutcome::Failed { class: FailureClass::Transient, reason: reason.into() }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        ReplayOutcome::Failed { class: FailureClass::Permanent, reason: reason.into() }
    }

    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            ReplayOutcome::Succeeded => None,
            ReplayOutcome::Failed { class, .. } => Some(*class),
        }
    }

    /// Whether the attempt should count towards the abandonment ceiling.
    pub fn counts_as_attempt(&self) -> bool {
        matches!(self.failure_class(), Some(FailureClass::Transient | FailureClass::Permanent))
    }
}

/// Next step after an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Remove the action and continue with the next one.
    Advance,
    /// Stop the session; the head stays queued for the next drain.
    Stop,
    /// Retry the same action after a delay.
    RetryAfter(Duration),
    /// Remove the action for good and continue. `report` is true when the
    /// user should be told individually.
    Abandon { reason: String, report: bool },
}

/// Abandonment ceiling and backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ReplayPolicy {
    fn default() -> Self {
        ReplayPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl ReplayPolicy {
    /// Exponential backoff with cap. `attempts` is the failure count so far.
    pub fn backoff(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        std::cmp::min(self.initial_backoff.saturating_mul(factor), self.max_backoff)
    }

    /// Decide the next step. `attempts` is the action's attempt count after
    /// this outcome was recorded.
    pub fn judge(&self, outcome: &ReplayOutcome, attempts: u32) -> Verdict {
        match outcome {
            ReplayOutcome::Succeeded => Verdict::Advance,
            ReplayOutcome::Failed { class: FailureClass::Connectivity, .. } => Verdict::Stop,
            ReplayOutcome::Failed { class: FailureClass::Permanent, reason } => {
                Verdict::Abandon { reason: reason.clone(), report: true }
            }
            ReplayOutcome::Failed { class: FailureClass::Transient, reason } => {
                if attempts >= self.max_attempts {
                    Verdict::Abandon {
                        reason: format!("gave up after {attempts} attempts: {reason}"),
                        report: false,
                    }
                } else {
                    Verdict::RetryAfter(self.backoff(attempts))
                }
            }
        }
    }
}

/// Coordinator state as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayState {
    Idle,
    Draining,
    Cancelled,
}

/// One drain cycle over a snapshot of queued ids.
#[derive(Debug, Clone)]
pub struct ReplaySession {
    ids: Vec<ActionId>,
    cursor: usize,
    cancelled: bool,
}

impl ReplaySession {
    pub fn start(ids: Vec<ActionId>) -> Self {
        ReplaySession { ids, cursor: 0, cancelled: false }
    }

    /// The action under the cursor, skipping ids no longer queued.
    ///
    /// Returns `None` once the snapshot is exhausted or the session was
    /// cancelled.
    pub fn current(&mut self, is_queued: impl Fn(ActionId) -> bool) -> Option<ActionId> {
        if self.cancelled {
            return None;
        }
        while let Some(&id) = self.ids.get(self.cursor) {
            if is_queued(id) {
                return Some(id);
            }
            self.cursor += 1;
        }
        None
    }

    /// Move past the current action.
    pub fn advance(&mut self) {
        if self.cursor < self.ids.len() {
            self.cursor += 1;
        }
    }

    /// Stop starting new items. Items not yet processed stay queued.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn remaining(&self) -> &[ActionId] {
        &self.ids[self.cursor.min(self.ids.len())..]
    }

    pub fn snapshot(&self) -> &[ActionId] {
        &self.ids
    }
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
