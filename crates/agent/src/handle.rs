// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The published interface of the connectivity service.
//!
//! Nothing here returns an error: status reads come from `watch` channels,
//! and commands sent after the service stopped resolve to neutral values
//! ([`EnqueueOutcome::Unavailable`], `0`, an empty list).

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use morsel_core::{ActionId, ActionKind, ConnectivityStatus, PendingAction, ReplayState};

use crate::service::{Command, ReplayEvent};

/// Result of [`ConnectivityHandle::enqueue_if_offline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Persisted; will be replayed once the backend is reachable.
    Queued(ActionId),
    /// The service has stopped; nothing was queued.
    Unavailable,
}

impl EnqueueOutcome {
    pub fn id(&self) -> Option<ActionId> {
        match self {
            EnqueueOutcome::Queued(id) => Some(*id),
            EnqueueOutcome::Unavailable => None,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, EnqueueOutcome::Queued(_))
    }
}

#[derive(Clone)]
pub struct ConnectivityHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<ConnectivityStatus>,
    queue_size: watch::Receiver<usize>,
    replay_state: watch::Receiver<ReplayState>,
    events: broadcast::Sender<ReplayEvent>,
}

impl std::fmt::Debug for ConnectivityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityHandle")
            .field("status", &self.status())
            .field("queue_size", &self.queue_size())
            .finish()
    }
}

impl ConnectivityHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        status: watch::Receiver<ConnectivityStatus>,
        queue_size: watch::Receiver<usize>,
        replay_state: watch::Receiver<ReplayState>,
        events: broadcast::Sender<ReplayEvent>,
    ) -> Self {
        ConnectivityHandle { commands, status, queue_size, replay_state, events }
    }

    pub fn status(&self) -> ConnectivityStatus {
        *self.status.borrow()
    }

    /// Receives every published status change.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectivityStatus> {
        self.status.clone()
    }

    pub fn is_online(&self) -> bool {
        self.status().is_online()
    }

    pub fn is_reachable(&self) -> bool {
        self.status().is_reachable()
    }

    pub fn queue_size(&self) -> usize {
        *self.queue_size.borrow()
    }

    pub fn subscribe_queue_size(&self) -> watch::Receiver<usize> {
        self.queue_size.clone()
    }

    pub fn replay_state(&self) -> ReplayState {
        *self.replay_state.borrow()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ReplayEvent> {
        self.events.subscribe()
    }

    /// Queue an action whose direct call failed for lack of connectivity.
    ///
    /// Also tells the service the backend just failed a caller, which demotes
    /// a stale "reachable" reading until the next probe confirms it.
    pub async fn enqueue_if_offline(&self, kind: ActionKind, payload: serde_json::Value) -> EnqueueOutcome {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Enqueue { kind, payload, reply }).await.is_err() {
            return EnqueueOutcome::Unavailable;
        }
        match rx.await {
            Ok(id) => EnqueueOutcome::Queued(id),
            Err(_) => EnqueueOutcome::Unavailable,
        }
    }

    /// Discard every queued action. Returns how many were dropped.
    pub async fn clear_queue(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Clear { reply }).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Snapshot of queued actions in replay order.
    pub async fn pending_actions(&self) -> Vec<PendingAction> {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Pending { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Stop the service and flush the queue. Idempotent.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}
