// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Replay handlers: the code that re-issues a queued action.
//!
//! Handlers are looked up by [`ActionKind`]. Application code registers one
//! per operation kind; a fallback (typically [`WebSocketForwarder`]) catches
//! everything else. A kind with no handler and no fallback is a permanent
//! failure for that action.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;

use morsel_core::protocol::{ClientMessage, ServerMessage};
use morsel_core::{ActionId, ActionKind, PendingAction, ReplayOutcome};

use crate::transport::{self, Transport, TransportError, WebSocketTransport};

pub type ReplayFuture<'a> = Pin<Box<dyn Future<Output = ReplayOutcome> + Send + 'a>>;

pub trait ReplayHandler: Send + Sync {
    fn replay(&self, action: PendingAction) -> ReplayFuture<'_>;
}

/// Adapts an async closure into a [`ReplayHandler`].
pub struct FnHandler<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(PendingAction) -> Fut + Send + Sync,
    Fut: Future<Output = ReplayOutcome> + Send + 'static,
{
    FnHandler(f)
}

impl<F, Fut> ReplayHandler for FnHandler<F>
where
    F: Fn(PendingAction) -> Fut + Send + Sync,
    Fut: Future<Output = ReplayOutcome> + Send + 'static,
{
    fn replay(&self, action: PendingAction) -> ReplayFuture<'_> {
        Box::pin((self.0)(action))
    }
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ReplayHandler>>,
    fallback: Option<Arc<dyn ReplayHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: ActionKind, handler: Arc<dyn ReplayHandler>) -> &mut Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn with(mut self, kind: ActionKind, handler: Arc<dyn ReplayHandler>) -> Self {
        self.register(kind, handler);
        self
    }

    pub fn with_fallback(mut self, handler: Arc<dyn ReplayHandler>) -> Self {
        self.fallback = Some(handler);
        self
    }

    pub fn resolve(&self, kind: &ActionKind) -> Option<Arc<dyn ReplayHandler>> {
        self.handlers.get(kind).or(self.fallback.as_ref()).cloned()
    }
}

/// Forwards actions to the backend as `Replay` messages over one WebSocket.
///
/// The connection is opened lazily and re-opened after it breaks. A request
/// abandoned mid-flight (the caller timed out) leaves its answer unread, so
/// the next request starts on a fresh connection.
pub struct WebSocketForwarder<T = WebSocketTransport> {
    url: String,
    channel: Mutex<Channel<T>>,
}

struct Channel<T> {
    transport: T,
    /// A request was sent and its answer never read.
    in_doubt: bool,
}

impl WebSocketForwarder {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_transport(url, WebSocketTransport::new())
    }
}

impl<T: Transport> WebSocketForwarder<T> {
    pub fn with_transport(url: impl Into<String>, transport: T) -> Self {
        WebSocketForwarder { url: url.into(), channel: Mutex::new(Channel { transport, in_doubt: false }) }
    }

    async fn forward(&self, action: PendingAction) -> Result<ServerMessage, TransportError> {
        let mut channel = self.channel.lock().await;
        if std::mem::take(&mut channel.in_doubt) {
            tracing::debug!("dropping connection with an unanswered request");
            channel.transport.close().await;
        }
        if !channel.transport.is_open() {
            channel.transport.connect(&self.url).await?;
        }
        let id = action.id;
        let msg = ClientMessage::replay(id, action.kind, action.payload);
        channel.in_doubt = true;
        let result = transport::request(&mut channel.transport, msg, |reply| answers(reply, id)).await;
        channel.in_doubt = false;
        if result.is_err() {
            channel.transport.close().await;
        }
        result
    }
}

/// `Error` carries no id; on a connection with one request outstanding it
/// answers that request.
fn answers(reply: &ServerMessage, id: ActionId) -> bool {
    match reply {
        ServerMessage::Error { .. } => true,
        other => other.action_id() == Some(id),
    }
}

/// Map a backend answer onto the replay taxonomy.
pub fn classify(answer: Result<ServerMessage, TransportError>) -> ReplayOutcome {
    match answer {
        Ok(ServerMessage::ReplayAck { .. }) => ReplayOutcome::Succeeded,
        Ok(ServerMessage::ReplayRejected { reason, retryable: true, .. }) => {
            ReplayOutcome::transient(reason)
        }
        Ok(ServerMessage::ReplayRejected { reason, retryable: false, .. }) => {
            ReplayOutcome::permanent(reason)
        }
        Ok(ServerMessage::Error { message }) => ReplayOutcome::permanent(message),
        Ok(ServerMessage::Pong { .. }) => ReplayOutcome::transient("unexpected pong"),
        Err(TransportError::SerializationError(e)) => ReplayOutcome::transient(e),
        Err(e) => ReplayOutcome::connectivity(e.to_string()),
    }
}

impl<T: Transport + 'static> ReplayHandler for WebSocketForwarder<T> {
    fn replay(&self, action: PendingAction) -> ReplayFuture<'_> {
        Box::pin(async move { classify(self.forward(action).await) })
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
