// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred mutating operations held in the pending queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Queue-assigned identifier. Monotonically increasing; also the replay order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u64);

impl ActionId {
    pub fn next(self) -> ActionId {
        ActionId(self.0.saturating_add(1))
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operation tag used to look up the replay handler, e.g. `meal_log.update`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActionKind(String);

impl ActionKind {
    /// Creates a kind, rejecting empty or whitespace-only tags.
    pub fn new(kind: impl Into<String>) -> Result<Self> {
        let kind = kind.into();
        let trimmed = kind.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(Error::InvalidKind(kind));
        }
        Ok(ActionKind(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ActionKind::new(s)
    }
}

impl TryFrom<String> for ActionKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ActionKind::new(value)
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.0
    }
}

/// Terminal outcome of an action. Set on the record handed back when it
/// leaves the queue; records still queued (and on disk) have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Succeeded,
    Abandoned,
}

/// One deferred mutating operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: ActionId,
    pub kind: ActionKind,
    /// Opaque payload handed back to the replay handler unchanged.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<Terminal>,
}

impl PendingAction {
    pub fn new(
        id: ActionId,
        kind: ActionKind,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        PendingAction { id, kind, payload, created_at, attempts: 0, last_attempt_at: None, terminal: None }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
