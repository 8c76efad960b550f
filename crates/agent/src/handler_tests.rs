// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::Utc;
use morsel_core::FailureClass;
use morsel_remote::{BackendState, RunningServer};
use std::time::Duration;
use yare::parameterized;

fn kind(s: &str) -> ActionKind {
    ActionKind::new(s).unwrap()
}

fn action(id: u64, k: &str) -> PendingAction {
    PendingAction::new(ActionId(id), kind(k), serde_json::json!({ "n": id }), Utc::now())
}

fn fixed(outcome: ReplayOutcome) -> Arc<dyn ReplayHandler> {
    Arc::new(handler_fn(move |_| {
        let outcome = outcome.clone();
        async move { outcome }
    }))
}

#[tokio::test]
async fn registry_prefers_specific_handler() {
    let registry = HandlerRegistry::new()
        .with(kind("meal_log.create"), fixed(ReplayOutcome::Succeeded))
        .with_fallback(fixed(ReplayOutcome::permanent("fallback")));

    let specific = registry.resolve(&kind("meal_log.create")).unwrap();
    assert_eq!(specific.replay(action(1, "meal_log.create")).await, ReplayOutcome::Succeeded);

    let other = registry.resolve(&kind("photo.analyze")).unwrap();
    assert_eq!(
        other.replay(action(2, "photo.analyze")).await,
        ReplayOutcome::permanent("fallback")
    );
}

#[test]
fn registry_without_fallback_misses() {
    let mut registry = HandlerRegistry::new();
    registry.register(kind("b.kind"), fixed(ReplayOutcome::Succeeded));
    registry.register(kind("a.kind"), fixed(ReplayOutcome::Succeeded));

    assert!(registry.resolve(&kind("c.kind")).is_none());
    assert!(registry.resolve(&kind("a.kind")).is_some());
    assert!(registry.resolve(&kind("b.kind")).is_some());
}

#[parameterized(
    ack = { Ok(ServerMessage::replay_ack(ActionId(1))), None },
    retryable = { Ok(ServerMessage::replay_rejected(ActionId(1), "busy", true)), Some(FailureClass::Transient) },
    rejected = { Ok(ServerMessage::replay_rejected(ActionId(1), "bad", false)), Some(FailureClass::Permanent) },
    server_error = { Ok(ServerMessage::error("malformed")), Some(FailureClass::Permanent) },
    closed = { Err(TransportError::ConnectionClosed), Some(FailureClass::Connectivity) },
    refused = { Err(TransportError::ConnectionFailed("refused".into())), Some(FailureClass::Connectivity) },
    garbled = { Err(TransportError::SerializationError("eof".into())), Some(FailureClass::Transient) },
)]
fn classify_answers(answer: Result<ServerMessage, TransportError>, expected: Option<FailureClass>) {
    assert_eq!(classify(answer).failure_class(), expected);
}

#[tokio::test]
async fn forwarder_replays_against_backend() {
    let state = BackendState::new();
    state.reject("meal_log.delete", "meal not found", false);
    state.reject("photo.analyze", "model busy", true);
    let server = RunningServer::start(state.clone()).await.unwrap();
    let forwarder = WebSocketForwarder::new(server.ws_url());

    assert_eq!(forwarder.replay(action(1, "meal_log.create")).await, ReplayOutcome::Succeeded);
    assert_eq!(
        forwarder.replay(action(2, "meal_log.delete")).await,
        ReplayOutcome::permanent("meal not found")
    );
    assert_eq!(
        forwarder.replay(action(3, "photo.analyze")).await,
        ReplayOutcome::transient("model busy")
    );

    let applied = state.applied();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].id, ActionId(1));
}

#[tokio::test]
async fn forwarder_without_backend_is_connectivity() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let forwarder = WebSocketForwarder::new(format!("ws://{addr}"));
    let outcome = forwarder.replay(action(1, "meal_log.create")).await;
    assert_eq!(outcome.failure_class(), Some(FailureClass::Connectivity));
}

/// One simulated connection: answers every replay except `stall` and keeps
/// unread answers until the next connect.
#[derive(Default)]
struct LaggyBackend {
    open: bool,
    connects: usize,
    stall: Option<ActionId>,
    inbox: std::collections::VecDeque<ServerMessage>,
}

impl Transport for LaggyBackend {
    fn connect<'a>(&'a mut self, _url: &'a str) -> transport::TransportFuture<'a, ()> {
        Box::pin(async move {
            self.open = true;
            self.connects += 1;
            self.inbox.clear();
            Ok(())
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move { self.open = false })
    }

    fn send(&mut self, msg: ClientMessage) -> transport::TransportFuture<'_, ()> {
        Box::pin(async move {
            if let ClientMessage::Replay { id, .. } = msg {
                if self.stall != Some(id) {
                    self.inbox.push_back(ServerMessage::replay_ack(id));
                }
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> transport::TransportFuture<'_, Option<ServerMessage>> {
        Box::pin(async move {
            match self.inbox.pop_front() {
                Some(msg) => Ok(Some(msg)),
                None => std::future::pending().await,
            }
        })
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[tokio::test(start_paused = true)]
async fn late_error_from_abandoned_request_is_not_taken_as_next_answer() {
    let backend = LaggyBackend { stall: Some(ActionId(1)), ..Default::default() };
    let forwarder = WebSocketForwarder::with_transport("ws://backend", backend);

    let first = tokio::time::timeout(Duration::from_millis(50), forwarder.replay(action(1, "meal_log.create"))).await;
    assert!(first.is_err());

    // The answer to the abandoned request shows up afterwards.
    forwarder.channel.lock().await.transport.inbox.push_back(ServerMessage::error("too late"));

    assert_eq!(forwarder.replay(action(2, "meal_log.create")).await, ReplayOutcome::Succeeded);
    assert_eq!(forwarder.channel.lock().await.transport.connects, 2);
}
