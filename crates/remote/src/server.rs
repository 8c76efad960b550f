// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Each connection is served by its own task. Every client message gets at
//! most one correlated answer; malformed messages get an `error` answer.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info};

use morsel_core::protocol::{ClientMessage, ServerMessage};

use crate::state::BackendState;

/// Run the WebSocket server on the given address.
pub async fn run(addr: SocketAddr, state: BackendState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", listener.local_addr()?);
    serve(listener, state).await?;
    Ok(())
}

/// Accept connections until the future is dropped.
///
/// Connection tasks belong to this future; dropping it closes them all.
pub async fn serve(listener: TcpListener, state: BackendState) -> std::io::Result<()> {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted?;
                let state = state.clone();
                connections.spawn(async move {
                    if let Err(e) = handle_connection(stream, peer_addr, state).await {
                        error!("Connection error from {}: {}", peer_addr, e);
                    }
                });
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: BackendState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    info!("New WebSocket connection from: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Some(response) = handle_client_message(&text, &state) {
                    let json = response.to_json()?;
                    ws_sink.send(Message::Text(json.into())).await?;
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", peer_addr);
                break;
            }
            Ok(Message::Ping(data)) => {
                ws_sink.send(Message::Pong(data)).await?;
            }
            Ok(_) => {
                // Binary, Pong and raw frames carry nothing for us.
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", peer_addr, e);
                break;
            }
        }
    }

    info!("Connection closed: {}", peer_addr);
    Ok(())
}

/// Answer one client message, or stay quiet while the backend is silenced.
pub(crate) fn handle_client_message(text: &str, state: &BackendState) -> Option<ServerMessage> {
    let msg = match ClientMessage::from_json(text) {
        Ok(msg) => msg,
        Err(e) => return Some(ServerMessage::error(format!("malformed message: {e}"))),
    };
    debug!("Received message: {:?}", msg);

    if state.is_silent() {
        debug!("silent, dropping message");
        return None;
    }

    match msg {
        ClientMessage::Ping { id } => Some(state.ping(id)),
        ClientMessage::Replay { id, kind, payload } => {
            let answer = state.replay(id, kind, payload);
            debug!("Replay answer: {:?}", answer);
            Some(answer)
        }
    }
}

/// A server bound to a local port, serving in the background.
///
/// Dropping it stops the server and closes every open connection.
pub struct RunningServer {
    addr: SocketAddr,
    state: BackendState,
    task: JoinHandle<()>,
}

impl RunningServer {
    /// Start on a random available port on 127.0.0.1.
    pub async fn start(state: BackendState) -> std::io::Result<Self> {
        Self::start_on(SocketAddr::from(([127, 0, 0, 1], 0)), state).await
    }

    /// Start on `addr`, e.g. to bring a stopped server back on the same port.
    pub async fn start_on(addr: SocketAddr, state: BackendState) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let serving = state.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = serve(listener, serving).await {
                error!("Server error: {}", e);
            }
        });
        Ok(RunningServer { addr, state, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn state(&self) -> &BackendState {
        &self.state
    }

    /// Stop serving. Returns once the listener is closed.
    pub async fn shutdown(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
