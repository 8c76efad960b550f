// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::config::ConfigError;
use crate::transport::TransportError;

/// Errors surfaced by the agent's setup paths and CLI commands.
///
/// The running service never returns these to callers of
/// [`ConnectivityHandle`](crate::ConnectivityHandle); they only appear while
/// wiring the service together or when a command cannot complete.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] morsel_core::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid payload: {0}\n  hint: payloads must be a JSON document, e.g. '{{\"kcal\": 320}}'")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("refusing to discard {0} queued action(s) without confirmation\n  hint: pass --yes to clear the queue")]
    ConfirmationRequired(usize),

    #[error("connectivity service already initialized")]
    AlreadyInitialized,

    #[error("logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
