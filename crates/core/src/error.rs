// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for morsel-core operations.

use thiserror::Error;

/// All possible errors that can occur in morsel-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid action kind: '{0}'\n  hint: kinds are non-empty tags such as 'meal_log.update'")]
    InvalidKind(String),

    #[error("invalid status: '{0}'\n  hint: valid statuses are: offline, online_unreachable, online_reachable")]
    InvalidStatus(String),

    #[error("queue is locked by another process: {0}\n  hint: only one agent may own the pending queue")]
    QueueLocked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for morsel-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
