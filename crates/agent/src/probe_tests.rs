// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use morsel_remote::{BackendState, RunningServer};

fn dead_addr() -> std::net::SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

struct Hanging;

impl Prober for Hanging {
    fn probe(&self) -> ProbeFuture<'_> {
        Box::pin(std::future::pending())
    }
}

#[tokio::test]
async fn websocket_probe_reachable() {
    let server = RunningServer::start(BackendState::new()).await.unwrap();
    let prober = WebSocketProber::new(server.ws_url());

    assert_eq!(prober.probe().await, Reachability::Reachable);
    assert_eq!(prober.probe().await, Reachability::Reachable);
    assert_eq!(server.state().ping_count(), 2);
}

#[tokio::test]
async fn websocket_probe_refused_is_unreachable() {
    let prober = WebSocketProber::new(format!("ws://{}", dead_addr()));
    assert_eq!(prober.probe().await, Reachability::Unreachable);
}

#[tokio::test]
async fn silent_backend_is_indeterminate() {
    let state = BackendState::new();
    state.set_silent(true);
    let server = RunningServer::start(state).await.unwrap();
    let prober = WebSocketProber::new(server.ws_url());

    let reading = probe_within(&prober, Duration::from_millis(200)).await;
    assert_eq!(reading, Reachability::Indeterminate);
}

#[tokio::test(start_paused = true)]
async fn probe_within_bounds_hanging_probe() {
    let reading = probe_within(&Hanging, Duration::from_secs(3)).await;
    assert_eq!(reading, Reachability::Indeterminate);
}

#[tokio::test]
async fn tcp_probe() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    assert_eq!(TcpProber::new(addr.to_string()).probe().await, Reachability::Reachable);
    drop(listener);
    assert_eq!(TcpProber::new(dead_addr().to_string()).probe().await, Reachability::Unreachable);
}

#[test]
fn from_url_picks_prober() {
    assert!(from_url("ws://127.0.0.1:7890").is_ok());
    assert!(from_url("wss://api.example").is_ok());
    assert!(from_url("tcp://127.0.0.1:443").is_ok());
    assert!(matches!(from_url("http://api.example"), Err(ConfigError::InvalidUrl { .. })));
}
