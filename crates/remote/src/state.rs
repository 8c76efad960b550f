// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Backend state: applied actions, rejection rules and fault switches.
//!
//! Shared between connection tasks and test code; every clone sees the same
//! state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use morsel_core::protocol::ServerMessage;
use morsel_core::{ActionId, ActionKind};

/// An action the backend accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedAction {
    pub id: ActionId,
    pub kind: ActionKind,
    pub payload: serde_json::Value,
}

/// Refuse replays of one action kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: String,
    pub reason: String,
    pub retryable: bool,
    /// How many more replays to refuse; `None` refuses forever.
    pub remaining: Option<u32>,
}

#[derive(Clone, Default)]
pub struct BackendState {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Answer nothing, as if requests were lost.
    silent: AtomicBool,
    pings: AtomicU64,
    rejections: Mutex<Vec<Rejection>>,
    applied: Mutex<Vec<AppliedAction>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BackendState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every replay of `kind`.
    pub fn reject(&self, kind: &str, reason: &str, retryable: bool) {
        self.add_rejection(Rejection {
            kind: kind.to_string(),
            reason: reason.to_string(),
            retryable,
            remaining: None,
        });
    }

    /// Refuse the next `times` replays of `kind`, then accept.
    pub fn reject_times(&self, kind: &str, reason: &str, retryable: bool, times: u32) {
        self.add_rejection(Rejection {
            kind: kind.to_string(),
            reason: reason.to_string(),
            retryable,
            remaining: Some(times),
        });
    }

    pub fn add_rejection(&self, rejection: Rejection) {
        lock(&self.inner.rejections).push(rejection);
    }

    pub fn set_silent(&self, silent: bool) {
        self.inner.silent.store(silent, Ordering::SeqCst);
    }

    pub fn is_silent(&self) -> bool {
        self.inner.silent.load(Ordering::SeqCst)
    }

    pub fn ping_count(&self) -> u64 {
        self.inner.pings.load(Ordering::SeqCst)
    }

    /// Accepted actions in the order they first arrived.
    pub fn applied(&self) -> Vec<AppliedAction> {
        lock(&self.inner.applied).clone()
    }

    pub fn ping(&self, id: u64) -> ServerMessage {
        self.inner.pings.fetch_add(1, Ordering::SeqCst);
        ServerMessage::pong(id)
    }

    /// Apply or refuse one replayed action.
    ///
    /// Replays are idempotent: an id that was already applied is acked again
    /// without being recorded twice.
    pub fn replay(&self, id: ActionId, kind: ActionKind, payload: serde_json::Value) -> ServerMessage {
        if let Some(refusal) = self.take_rejection(&kind) {
            return refusal.with_id(id);
        }

        let mut applied = lock(&self.inner.applied);
        if !applied.iter().any(|a| a.id == id) {
            applied.push(AppliedAction { id, kind, payload });
        }
        ServerMessage::replay_ack(id)
    }

    fn take_rejection(&self, kind: &ActionKind) -> Option<Refusal> {
        let mut rules = lock(&self.inner.rejections);
        let index = rules.iter().position(|r| r.kind == kind.as_str())?;
        let rule = &mut rules[index];
        let refusal = Refusal { reason: rule.reason.clone(), retryable: rule.retryable };
        match rule.remaining {
            Some(0) => {
                rules.remove(index);
                return None;
            }
            Some(1) => {
                rules.remove(index);
            }
            Some(n) => rule.remaining = Some(n - 1),
            None => {}
        }
        Some(refusal)
    }
}

struct Refusal {
    reason: String,
    retryable: bool,
}

impl Refusal {
    fn with_id(self, id: ActionId) -> ServerMessage {
        ServerMessage::replay_rejected(id, self.reason, self.retryable)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
