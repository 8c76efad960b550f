// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Backend reachability probes.
//!
//! A probe answers one question: does the backend respond right now? Probes
//! never decide status themselves; the service hands their results to the
//! reconciler, tagged with the link epoch they were issued in.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use morsel_core::protocol::{ClientMessage, ServerMessage};
use morsel_core::Reachability;

use crate::config::ConfigError;
use crate::transport::{self, Transport, WebSocketTransport};

pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = Reachability> + Send + 'a>>;

pub trait Prober: Send + Sync {
    fn probe(&self) -> ProbeFuture<'_>;
}

/// Run `prober` with an upper bound. Overrunning is `Indeterminate`.
pub async fn probe_within(prober: &dyn Prober, timeout: Duration) -> Reachability {
    match tokio::time::timeout(timeout, prober.probe()).await {
        Ok(reachability) => reachability,
        Err(_) => {
            tracing::debug!(?timeout, "probe timed out");
            Reachability::Indeterminate
        }
    }
}

/// Build the prober for a configured probe URL.
pub fn from_url(url: &str) -> Result<Arc<dyn Prober>, ConfigError> {
    if let Some(addr) = url.strip_prefix("tcp://") {
        return Ok(Arc::new(TcpProber::new(addr)));
    }
    if url.starts_with("ws://") || url.starts_with("wss://") {
        return Ok(Arc::new(WebSocketProber::new(url)));
    }
    Err(ConfigError::InvalidUrl {
        field: "probe_url",
        url: url.to_string(),
        expected: "ws://, wss:// or tcp://",
    })
}

/// Opens a WebSocket, sends `Ping{id}` and waits for the matching `Pong`.
pub struct WebSocketProber {
    url: String,
    next_id: AtomicU64,
}

impl WebSocketProber {
    pub fn new(url: impl Into<String>) -> Self {
        WebSocketProber { url: url.into(), next_id: AtomicU64::new(1) }
    }
}

impl Prober for WebSocketProber {
    fn probe(&self) -> ProbeFuture<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move {
            let mut transport = WebSocketTransport::new();
            if let Err(e) = transport.connect(&self.url).await {
                tracing::debug!(url = %self.url, error = %e, "probe connect failed");
                return Reachability::Unreachable;
            }
            let answer = transport::request(&mut transport, ClientMessage::ping(id), |msg| {
                matches!(msg, ServerMessage::Pong { id: pong } if *pong == id)
            })
            .await;
            transport.close().await;
            match answer {
                Ok(_) => Reachability::Reachable,
                Err(e) => {
                    tracing::debug!(url = %self.url, error = %e, "probe got no pong");
                    Reachability::Unreachable
                }
            }
        })
    }
}

/// Connect-only probe for backends without a ping endpoint.
pub struct TcpProber {
    addr: String,
}

impl TcpProber {
    pub fn new(addr: impl Into<String>) -> Self {
        TcpProber { addr: addr.into() }
    }
}

impl Prober for TcpProber {
    fn probe(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            match tokio::net::TcpStream::connect(&self.addr).await {
                Ok(_) => Reachability::Reachable,
                Err(e) => {
                    tracing::debug!(addr = %self.addr, error = %e, "tcp probe failed");
                    Reachability::Unreachable
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
