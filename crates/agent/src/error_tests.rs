// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn core_errors_pass_through() {
    let err: AgentError = morsel_core::Error::QueueLocked("/tmp/queue.jsonl".into()).into();
    let msg = err.to_string();
    assert!(msg.contains("locked"));
    assert!(msg.contains("/tmp/queue.jsonl"));
}

#[test]
fn invalid_payload_has_hint() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: AgentError = json_err.into();
    assert!(err.to_string().contains("hint"));
}

#[test]
fn transport_errors_convert() {
    let err: AgentError = TransportError::ConnectionClosed.into();
    assert!(matches!(err, AgentError::Transport(_)));
}

#[test]
fn confirmation_required_names_count_and_flag() {
    let msg = AgentError::ConfirmationRequired(3).to_string();
    assert!(msg.contains("3 queued action(s)"));
    assert!(msg.contains("hint: pass --yes"));
}
