// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between the client agent and the backend.
//!
//! The protocol is simple:
//! - Client sends pings (reachability probes) and replayed actions
//! - Server answers each with a correlated response

use serde::{Deserialize, Serialize};

use crate::action::{ActionId, ActionKind};

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Lightweight reachability probe.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },

    /// Replay a previously deferred action.
    Replay {
        id: ActionId,
        kind: ActionKind,
        payload: serde_json::Value,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// The replayed action was applied.
    ReplayAck { id: ActionId },

    /// The replayed action was refused.
    ReplayRejected {
        id: ActionId,
        reason: String,
        /// True for overload/rate-limit style refusals worth retrying;
        /// false for validation or conflict errors.
        retryable: bool,
    },

    /// Error response for malformed requests.
    Error { message: String },
}

impl ClientMessage {
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    pub fn replay(id: ActionId, kind: ActionKind, payload: serde_json::Value) -> Self {
        ClientMessage::Replay { id, kind, payload }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ServerMessage {
    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    pub fn replay_ack(id: ActionId) -> Self {
        ServerMessage::ReplayAck { id }
    }

    pub fn replay_rejected(id: ActionId, reason: impl Into<String>, retryable: bool) -> Self {
        ServerMessage::ReplayRejected { id, reason: reason.into(), retryable }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { message: message.into() }
    }

    /// The action this message answers, if any.
    pub fn action_id(&self) -> Option<ActionId> {
        match self {
            ServerMessage::ReplayAck { id } | ServerMessage::ReplayRejected { id, .. } => Some(*id),
            ServerMessage::Pong { .. } | ServerMessage::Error { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
