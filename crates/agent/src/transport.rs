// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Message transport between the agent and the backend.
//!
//! Probes and the replay forwarder speak [`ClientMessage`]/[`ServerMessage`]
//! through the [`Transport`] trait, so tests can script the backend without
//! sockets.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use morsel_core::protocol::{ClientMessage, ServerMessage};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The peer sent something that is not a protocol message.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

pub trait Transport: Send + Sync {
    fn connect<'a>(&'a mut self, url: &'a str) -> TransportFuture<'a, ()>;

    /// Close the connection, if any. Never fails.
    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()>;

    /// Next protocol message; `None` once the peer closed the connection.
    fn recv(&mut self) -> TransportFuture<'_, Option<ServerMessage>>;

    fn is_open(&self) -> bool;
}

/// Send `msg` and wait for the first answer accepted by `answers`.
///
/// Unrelated messages are skipped. A closed connection is an error, since a
/// request without an answer cannot be judged.
pub async fn request<T, F>(transport: &mut T, msg: ClientMessage, answers: F) -> TransportResult<ServerMessage>
where
    T: Transport + ?Sized,
    F: Fn(&ServerMessage) -> bool,
{
    transport.send(msg).await?;
    loop {
        match transport.recv().await? {
            Some(reply) if answers(&reply) => return Ok(reply),
            Some(other) => {
                tracing::debug!(?other, "skipping unrelated server message");
            }
            None => return Err(TransportError::ConnectionClosed),
        }
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Connection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl Connection {
    async fn open(url: &str) -> Result<Self, tungstenite::Error> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        let (sink, stream) = ws.split();
        Ok(Connection { sink, stream })
    }

    /// Write one text frame and flush it, so a dead peer fails here.
    async fn write(&mut self, text: String) -> Result<(), tungstenite::Error> {
        self.sink.send(Message::Text(text.into())).await?;
        self.sink.flush().await
    }

    /// Next text frame, skipping control frames. `None` on close.
    async fn read(&mut self) -> Option<Result<String, tungstenite::Error>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// [`Transport`] over a tokio-tungstenite WebSocket.
///
/// Any I/O failure drops the connection; callers reconnect explicitly.
#[derive(Default)]
pub struct WebSocketTransport {
    conn: Option<Connection>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WebSocketTransport {
    fn connect<'a>(&'a mut self, url: &'a str) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            let conn = Connection::open(url).await.map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            self.conn = Some(conn);
            Ok(())
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Some(mut conn) = self.conn.take() {
                let _ = conn.sink.close().await;
            }
        })
    }

    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let json = msg.to_json().map_err(|e| TransportError::SerializationError(e.to_string()))?;
            let conn = self.conn.as_mut().ok_or(TransportError::ConnectionClosed)?;
            if let Err(e) = conn.write(json).await {
                self.conn = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<ServerMessage>> {
        Box::pin(async move {
            let conn = self.conn.as_mut().ok_or(TransportError::ConnectionClosed)?;
            match conn.read().await {
                Some(Ok(text)) => ServerMessage::from_json(&text)
                    .map(Some)
                    .map_err(|e| TransportError::SerializationError(e.to_string())),
                Some(Err(e)) => {
                    self.conn = None;
                    Err(TransportError::ReceiveFailed(e.to_string()))
                }
                None => {
                    self.conn = None;
                    Ok(None)
                }
            }
        })
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
