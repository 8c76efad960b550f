// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use morsel_core::{ActionId, ActionKind};
use serde_json::json;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Sink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type Stream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

async fn connect(server: &RunningServer) -> (Sink, Stream) {
    let (ws, _) = connect_async(server.ws_url()).await.unwrap();
    ws.split()
}

async fn exchange(sink: &mut Sink, stream: &mut Stream, msg: &ClientMessage) -> ServerMessage {
    sink.send(Message::Text(msg.to_json().unwrap().into())).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), stream.next()).await.unwrap();
    match reply {
        Some(Ok(Message::Text(text))) => ServerMessage::from_json(&text).unwrap(),
        other => panic!("expected text reply, got {other:?}"),
    }
}

fn kind(s: &str) -> ActionKind {
    ActionKind::new(s).unwrap()
}

#[test]
fn malformed_message_gets_error_answer() {
    let state = BackendState::new();
    let answer = handle_client_message("{\"type\":\"bogus\"}", &state);
    assert!(matches!(answer, Some(ServerMessage::Error { .. })));
}

#[test]
fn silent_backend_answers_nothing() {
    let state = BackendState::new();
    state.set_silent(true);
    assert_eq!(handle_client_message(&ClientMessage::ping(1).to_json().unwrap(), &state), None);
}

#[tokio::test]
async fn ping_gets_correlated_pong() {
    let server = RunningServer::start(BackendState::new()).await.unwrap();
    let (mut sink, mut stream) = connect(&server).await;

    let answer = exchange(&mut sink, &mut stream, &ClientMessage::ping(42)).await;
    assert_eq!(answer, ServerMessage::pong(42));
    assert_eq!(server.state().ping_count(), 1);
}

#[tokio::test]
async fn replay_is_acked_and_recorded() {
    let server = RunningServer::start(BackendState::new()).await.unwrap();
    let (mut sink, mut stream) = connect(&server).await;

    let msg = ClientMessage::replay(ActionId(3), kind("meal_log.create"), json!({ "kcal": 510 }));
    let answer = exchange(&mut sink, &mut stream, &msg).await;

    assert_eq!(answer, ServerMessage::replay_ack(ActionId(3)));
    let applied = server.state().applied();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].payload, json!({ "kcal": 510 }));
}

#[tokio::test]
async fn rejected_kind_is_refused_over_the_wire() {
    let state = BackendState::new();
    state.reject("meal_log.delete", "meal not found", false);
    let server = RunningServer::start(state).await.unwrap();
    let (mut sink, mut stream) = connect(&server).await;

    let msg = ClientMessage::replay(ActionId(9), kind("meal_log.delete"), json!({}));
    let answer = exchange(&mut sink, &mut stream, &msg).await;
    assert_eq!(answer, ServerMessage::replay_rejected(ActionId(9), "meal not found", false));
    assert!(server.state().applied().is_empty());
}

#[tokio::test]
async fn connections_share_state() {
    let server = RunningServer::start(BackendState::new()).await.unwrap();
    let (mut a_sink, mut a_stream) = connect(&server).await;
    let (mut b_sink, mut b_stream) = connect(&server).await;

    exchange(&mut a_sink, &mut a_stream, &ClientMessage::ping(1)).await;
    exchange(&mut b_sink, &mut b_stream, &ClientMessage::ping(2)).await;
    assert_eq!(server.state().ping_count(), 2);
}

#[tokio::test]
async fn shutdown_closes_open_connections() {
    let server = RunningServer::start(BackendState::new()).await.unwrap();
    let addr = server.addr();
    let (_sink, mut stream) = connect(&server).await;

    server.shutdown().await;

    let next = tokio::time::timeout(Duration::from_secs(5), stream.next()).await.unwrap();
    assert!(!matches!(next, Some(Ok(Message::Text(_)))));
    assert!(connect_async(format!("ws://{addr}")).await.is_err());
}

#[tokio::test]
async fn restart_on_same_port() {
    let state = BackendState::new();
    let server = RunningServer::start(state.clone()).await.unwrap();
    let addr = server.addr();
    server.shutdown().await;

    let server = RunningServer::start_on(addr, state).await.unwrap();
    let (mut sink, mut stream) = connect(&server).await;
    assert_eq!(exchange(&mut sink, &mut stream, &ClientMessage::ping(5)).await, ServerMessage::pong(5));
}
