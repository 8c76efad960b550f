// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The connectivity service: one actor task on one logical timeline.
//!
//! The actor owns the reconciler, the queue, the debouncer and the replay
//! session, and handles one event at a time:
//! - link changes from a `watch` channel
//! - probe results, replay outcomes and timer expiries from spawned tasks
//! - commands from [`ConnectivityHandle`] clones
//!
//! Probe and handler calls run in their own tasks and report back through
//! the internal channel, so a slow backend never stalls status updates. At
//! most one probe and one replay are in flight at any time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use morsel_core::{
    ActionId, ActionKind, ConnectivityReconciler, ConnectivityStatus, Decision, FailureClass,
    MessageClass, NotificationDebouncer, PendingAction, PendingActionQueue, Reachability,
    ReplayOutcome, ReplayPolicy, ReplaySession, ReplayState, Transition, Verdict,
};

use crate::config::Config;
use crate::handle::ConnectivityHandle;
use crate::handler::{HandlerRegistry, ReplayHandler};
use crate::notify::{Notification, Notifier};
use crate::probe::{self, Prober};
use crate::schedule::ScheduledTask;

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// Timing knobs for the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub probe_interval: Duration,
    pub steady_interval: Duration,
    pub probe_timeout: Duration,
    pub replay_timeout: Duration,
    pub cooldown: Duration,
    pub policy: ReplayPolicy,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        ServiceOptions {
            probe_interval: Duration::from_millis(config.probe.interval_ms),
            steady_interval: Duration::from_millis(config.probe.steady_interval_ms),
            probe_timeout: Duration::from_millis(config.probe.timeout_ms),
            replay_timeout: Duration::from_millis(config.replay.timeout_ms),
            cooldown: Duration::from_millis(config.notify.cooldown_ms),
            policy: config.replay_policy(),
        }
    }
}

/// Reported on [`ConnectivityHandle::subscribe_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEvent {
    DrainStarted { pending: usize },
    Replayed { id: ActionId, kind: ActionKind },
    Abandoned { id: ActionId, kind: ActionKind, class: FailureClass, reason: String },
    DrainFinished { state: ReplayState, remaining: usize },
}

/// What the service talks to.
pub struct Collaborators {
    pub link: watch::Receiver<bool>,
    pub prober: Arc<dyn Prober>,
    pub handlers: HandlerRegistry,
    pub notifier: Arc<dyn Notifier>,
}

pub(crate) enum Command {
    Enqueue { kind: ActionKind, payload: serde_json::Value, reply: oneshot::Sender<ActionId> },
    Clear { reply: oneshot::Sender<usize> },
    Pending { reply: oneshot::Sender<Vec<PendingAction>> },
    Shutdown { reply: oneshot::Sender<()> },
}

enum Internal {
    ProbeDue { generation: u64 },
    ProbeDone { epoch: u64, reachability: Reachability },
    ReplayDone { id: ActionId, outcome: ReplayOutcome },
    RetryDue { serial: u64 },
    NoticeDue { generation: u64 },
}

struct Drain {
    serial: u64,
    session: ReplaySession,
    token: CancellationToken,
    in_flight: Option<ActionId>,
    backoff: Option<ScheduledTask>,
}

/// Run one handler call, counting a timeout as a connectivity failure.
async fn replay_within(handler: Arc<dyn ReplayHandler>, action: PendingAction, timeout: Duration) -> ReplayOutcome {
    match tokio::time::timeout(timeout, handler.replay(action)).await {
        Ok(outcome) => outcome,
        Err(_) => ReplayOutcome::connectivity(format!("replay timed out after {}ms", timeout.as_millis())),
    }
}

/// Start the service on the current tokio runtime.
pub fn spawn(queue: PendingActionQueue, parts: Collaborators, options: ServiceOptions) -> ConnectivityHandle {
    let (cmd_tx, commands) = mpsc::channel(COMMAND_BUFFER);
    let (internal_tx, internal_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(ConnectivityStatus::Offline);
    let (size_tx, size_rx) = watch::channel(queue.len());
    let (state_tx, state_rx) = watch::channel(ReplayState::Idle);
    let (events, _) = broadcast::channel(EVENT_BUFFER);

    let handle = ConnectivityHandle::new(cmd_tx, status_rx, size_rx, state_rx, events.clone());

    let actor = Actor {
        reconciler: ConnectivityReconciler::new(),
        queue,
        debouncer: NotificationDebouncer::new(options.cooldown),
        options,
        prober: parts.prober,
        handlers: parts.handlers,
        notifier: parts.notifier,
        link: parts.link,
        link_open: true,
        commands,
        internal_tx,
        internal_rx,
        status_tx,
        size_tx,
        state_tx,
        events,
        probe_in_flight: false,
        probe_again: false,
        probe_timer: None,
        probe_generation: 0,
        settled: false,
        noticed: None,
        notice_timer: None,
        notice_generation: 0,
        drain: None,
        drain_serial: 0,
        redrain: false,
    };
    tokio::spawn(actor.run());
    handle
}

struct Actor {
    reconciler: ConnectivityReconciler,
    queue: PendingActionQueue,
    debouncer: NotificationDebouncer,
    options: ServiceOptions,
    prober: Arc<dyn Prober>,
    handlers: HandlerRegistry,
    notifier: Arc<dyn Notifier>,

    link: watch::Receiver<bool>,
    link_open: bool,
    commands: mpsc::Receiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,

    status_tx: watch::Sender<ConnectivityStatus>,
    size_tx: watch::Sender<usize>,
    state_tx: watch::Sender<ReplayState>,
    events: broadcast::Sender<ReplayEvent>,

    probe_in_flight: bool,
    /// A link-up edge arrived while a probe for the old epoch was running.
    probe_again: bool,
    probe_timer: Option<ScheduledTask>,
    probe_generation: u64,

    /// The first status worth judging is known (link down, or first probe).
    settled: bool,
    noticed: Option<ConnectivityStatus>,
    notice_timer: Option<ScheduledTask>,
    notice_generation: u64,

    drain: Option<Drain>,
    drain_serial: u64,
    /// Re-entered reachable while a cancelled drain was finishing.
    redrain: bool,
}

impl Actor {
    async fn run(mut self) {
        let up = *self.link.borrow_and_update();
        info!(link_up = up, queued = self.queue.len(), "connectivity service started");
        self.apply_link(up);

        let mut shutdown_reply = None;
        loop {
            tokio::select! {
                changed = self.link.changed(), if self.link_open => match changed {
                    Ok(()) => {
                        let up = *self.link.borrow_and_update();
                        self.apply_link(up);
                    }
                    Err(_) => {
                        debug!("link source closed, keeping last link state");
                        self.link_open = false;
                    }
                },
                Some(event) = self.internal_rx.recv() => self.on_internal(event),
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if let Some(reply) = self.on_command(command) {
                            shutdown_reply = Some(reply);
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.stop();
        // Release the queue lock before acknowledging.
        drop(self);
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────────────────

    fn apply_link(&mut self, up: bool) {
        debug!(up, "link event");
        let rising = up && !self.reconciler.link_up();
        if let Some(t) = self.reconciler.on_link(up) {
            self.publish(t);
        }
        if rising {
            self.probe_now();
        }
        if !up {
            self.settle();
        }
    }

    fn publish(&mut self, t: Transition) {
        info!(from = %t.from, to = %t.to, "connectivity changed");
        self.status_tx.send_replace(t.to);
        self.schedule_probe();
        if t.left_reachable() {
            self.cancel_drain("backend no longer reachable");
        }
        self.consider_notice(t.to);
        if t.entered_reachable() {
            self.start_drain();
        }
    }

    fn mark_suspect(&mut self) {
        if let Some(t) = self.reconciler.mark_suspect() {
            self.publish(t);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Probing
    // ─────────────────────────────────────────────────────────────────────

    fn schedule_probe(&mut self) {
        if !self.reconciler.should_probe() {
            self.probe_timer = None;
            return;
        }
        if self.probe_in_flight {
            return;
        }
        let delay = if self.reconciler.status().is_reachable() {
            self.options.steady_interval
        } else {
            self.options.probe_interval
        };
        self.probe_generation += 1;
        let event = Internal::ProbeDue { generation: self.probe_generation };
        self.probe_timer = Some(ScheduledTask::after(delay, &self.internal_tx, event));
    }

    fn probe_now(&mut self) {
        if !self.reconciler.should_probe() {
            return;
        }
        if self.probe_in_flight {
            self.probe_again = true;
            return;
        }
        self.probe_timer = None;
        self.probe_in_flight = true;

        let epoch = self.reconciler.epoch();
        let prober = Arc::clone(&self.prober);
        let timeout = self.options.probe_timeout;
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let probing = tokio::spawn(async move { probe::probe_within(prober.as_ref(), timeout).await });
            let reachability = probing.await.unwrap_or_else(|e| {
                warn!(error = %e, "prober failed without a result");
                Reachability::Indeterminate
            });
            let _ = tx.send(Internal::ProbeDone { epoch, reachability });
        });
    }

    fn on_probe_done(&mut self, epoch: u64, reachability: Reachability) {
        self.probe_in_flight = false;
        debug!(epoch, %reachability, "probe result");
        let fresh = epoch == self.reconciler.epoch() && self.reconciler.link_up();
        if let Some(t) = self.reconciler.on_probe_for(epoch, reachability) {
            self.publish(t);
        }
        if fresh {
            self.settle();
        }
        if std::mem::take(&mut self.probe_again) {
            self.probe_now();
        } else {
            self.schedule_probe();
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────

    fn now() -> std::time::Instant {
        tokio::time::Instant::now().into_std()
    }

    fn settle(&mut self) {
        if self.settled {
            return;
        }
        self.settled = true;
        let status = self.reconciler.status();
        let decision = self.debouncer.evaluate(None, status, Self::now());
        self.noticed = Some(status);
        self.act_on(decision);
    }

    fn consider_notice(&mut self, status: ConnectivityStatus) {
        if !self.settled {
            self.notice_timer = None;
            return;
        }
        let decision = self.debouncer.evaluate(self.noticed, status, Self::now());
        self.noticed = Some(status);
        // A deferred `Degraded` survives moves between degraded states.
        if decision != Decision::Ignore || !status.is_degraded() {
            self.notice_timer = None;
        }
        self.act_on(decision);
    }

    fn act_on(&mut self, decision: Decision) {
        match decision {
            Decision::Show(class) => self.show(class),
            Decision::Suppress { class, until } => {
                let delay = until.saturating_duration_since(Self::now());
                debug!(?class, ?delay, "notification suppressed by cooldown");
                self.notice_generation += 1;
                let event = Internal::NoticeDue { generation: self.notice_generation };
                self.notice_timer = Some(ScheduledTask::after(delay, &self.internal_tx, event));
            }
            Decision::Ignore => {}
        }
    }

    fn show(&self, class: MessageClass) {
        let notification = Notification::for_status(class, self.reconciler.status());
        info!(?class, "{}", notification.title);
        self.notifier.show(&notification);
        self.notifier.announce(&notification.announcement());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Replay
    // ─────────────────────────────────────────────────────────────────────

    fn start_drain(&mut self) {
        if !self.reconciler.status().is_reachable() || self.queue.is_empty() {
            return;
        }
        if let Some(drain) = &self.drain {
            if drain.session.is_cancelled() {
                self.redrain = true;
            }
            return;
        }

        self.drain_serial += 1;
        let session = ReplaySession::start(self.queue.ids());
        let pending = session.snapshot().len();
        info!(pending, "replaying queued actions");
        let _ = self.events.send(ReplayEvent::DrainStarted { pending });
        self.state_tx.send_replace(ReplayState::Draining);
        self.drain = Some(Drain {
            serial: self.drain_serial,
            session,
            token: CancellationToken::new(),
            in_flight: None,
            backoff: None,
        });
        self.pump();
    }

    /// Start the next action, or finish the session.
    fn pump(&mut self) {
        loop {
            let Some(drain) = self.drain.as_mut() else {
                return;
            };
            if drain.in_flight.is_some() || drain.backoff.is_some() {
                return;
            }
            if drain.session.is_cancelled() {
                self.finish_drain(ReplayState::Cancelled);
                return;
            }
            let queue = &self.queue;
            let Some(id) = drain.session.current(|id| queue.contains(id)) else {
                self.finish_drain(ReplayState::Idle);
                return;
            };
            let Some(action) = queue.get(id).cloned() else {
                drain.session.advance();
                continue;
            };

            match self.handlers.resolve(&action.kind) {
                Some(handler) => {
                    drain.in_flight = Some(id);
                    debug!(%id, kind = %action.kind, attempts = action.attempts, "replaying action");
                    let timeout = self.options.replay_timeout;
                    let tx = self.internal_tx.clone();
                    tokio::spawn(async move {
                        let replaying = tokio::spawn(replay_within(handler, action, timeout));
                        let outcome = replaying.await.unwrap_or_else(|e| {
                            warn!(%id, error = %e, "replay handler failed without an outcome");
                            ReplayOutcome::transient("handler panicked")
                        });
                        let _ = tx.send(Internal::ReplayDone { id, outcome });
                    });
                    return;
                }
                None => {
                    let reason = format!("no handler registered for '{}'", action.kind);
                    self.record(id, ReplayOutcome::permanent(reason));
                }
            }
        }
    }

    fn on_replay_done(&mut self, id: ActionId, outcome: ReplayOutcome) {
        match self.drain.as_mut() {
            Some(drain) if drain.in_flight == Some(id) => drain.in_flight = None,
            _ => {
                warn!(%id, "replay outcome without matching session");
                return;
            }
        }
        self.record(id, outcome);
        self.pump();
    }

    /// Apply one outcome to the queue and the session.
    fn record(&mut self, id: ActionId, outcome: ReplayOutcome) {
        let attempts = if outcome.counts_as_attempt() {
            self.queue.mark_failed_attempt(id)
        } else {
            self.queue.get(id).map(|action| action.attempts)
        };
        let Some(attempts) = attempts else {
            debug!(%id, "action left the queue while replaying");
            self.advance_session();
            self.publish_size();
            return;
        };

        match self.options.policy.judge(&outcome, attempts) {
            Verdict::Advance => {
                if let Some(action) = self.queue.mark_succeeded(id) {
                    info!(%id, kind = %action.kind, "replayed");
                    let _ = self.events.send(ReplayEvent::Replayed { id, kind: action.kind });
                }
                self.advance_session();
            }
            Verdict::Stop => {
                warn!(%id, ?outcome, "replay stopped by connectivity failure");
                let suspect = self.reconciler.mark_suspect();
                self.finish_drain(ReplayState::Idle);
                if let Some(t) = suspect {
                    self.publish(t);
                }
            }
            Verdict::RetryAfter(delay) => {
                info!(%id, attempts, ?delay, "transient replay failure, retrying");
                if let Some(drain) = self.drain.as_mut() {
                    if !drain.session.is_cancelled() {
                        let event = Internal::RetryDue { serial: drain.serial };
                        drain.backoff =
                            Some(ScheduledTask::after_within(&drain.token, delay, &self.internal_tx, event));
                    }
                }
            }
            Verdict::Abandon { reason, report } => {
                if let Some(action) = self.queue.abandon(id) {
                    warn!(%id, kind = %action.kind, reason = %reason, "abandoned queued action");
                    if report {
                        self.notifier.action_failed(&action, &reason);
                    }
                    let class = outcome.failure_class().unwrap_or(FailureClass::Permanent);
                    let _ = self.events.send(ReplayEvent::Abandoned { id, kind: action.kind, class, reason });
                }
                self.advance_session();
            }
        }
        self.publish_size();
    }

    fn advance_session(&mut self) {
        if let Some(drain) = self.drain.as_mut() {
            drain.session.advance();
        }
    }

    fn on_retry_due(&mut self, serial: u64) {
        match self.drain.as_mut() {
            Some(drain) if drain.serial == serial && drain.backoff.is_some() => drain.backoff = None,
            _ => return,
        }
        self.pump();
    }

    fn cancel_drain(&mut self, reason: &str) {
        let Some(drain) = self.drain.as_mut() else {
            return;
        };
        if !drain.session.is_cancelled() {
            info!(reason, "cancelling replay");
        }
        drain.session.cancel();
        drain.token.cancel();
        drain.backoff = None;
        self.state_tx.send_replace(ReplayState::Cancelled);
        self.pump();
    }

    fn finish_drain(&mut self, state: ReplayState) {
        let Some(drain) = self.drain.take() else {
            return;
        };
        drain.token.cancel();
        let remaining = self.queue.len();
        let unvisited = drain.session.remaining().len();
        info!(?state, remaining, unvisited, "replay finished");
        let _ = self.events.send(ReplayEvent::DrainFinished { state, remaining });
        self.state_tx.send_replace(ReplayState::Idle);
        if std::mem::take(&mut self.redrain) {
            self.start_drain();
        }
    }

    fn publish_size(&self) {
        let len = self.queue.len();
        self.size_tx.send_if_modified(|current| {
            if *current == len {
                return false;
            }
            *current = len;
            true
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────

    fn on_internal(&mut self, event: Internal) {
        match event {
            Internal::ProbeDue { generation } => {
                if generation == self.probe_generation && self.probe_timer.take().is_some() {
                    self.probe_now();
                }
            }
            Internal::ProbeDone { epoch, reachability } => self.on_probe_done(epoch, reachability),
            Internal::ReplayDone { id, outcome } => self.on_replay_done(id, outcome),
            Internal::RetryDue { serial } => self.on_retry_due(serial),
            Internal::NoticeDue { generation } => {
                if generation == self.notice_generation && self.notice_timer.take().is_some() {
                    let decision = self.debouncer.resolve_deferred(self.reconciler.status(), Self::now());
                    self.act_on(decision);
                }
            }
        }
    }

    /// Returns the reply channel of a shutdown request.
    fn on_command(&mut self, command: Command) -> Option<oneshot::Sender<()>> {
        match command {
            Command::Enqueue { kind, payload, reply } => {
                let id = self.queue.enqueue(kind, payload);
                info!(%id, queued = self.queue.len(), "action queued");
                self.publish_size();
                let _ = reply.send(id);
                // The caller just failed to reach the backend.
                self.mark_suspect();
            }
            Command::Clear { reply } => {
                let count = self.queue.clear_all();
                warn!(count, "pending queue cleared");
                self.publish_size();
                self.cancel_drain("queue cleared");
                let _ = reply.send(count);
            }
            Command::Pending { reply } => {
                let _ = reply.send(self.queue.peek_in_order().to_vec());
            }
            Command::Shutdown { reply } => return Some(reply),
        }
        None
    }

    fn stop(&mut self) {
        self.probe_timer = None;
        self.notice_timer = None;
        if let Some(drain) = self.drain.take() {
            drain.token.cancel();
        }
        if let Err(e) = self.queue.flush() {
            warn!(error = %e, "failed to flush pending queue");
        }
        info!("connectivity service stopped");
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
