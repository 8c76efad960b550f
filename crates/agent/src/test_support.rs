// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted collaborators for service tests.

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Semaphore};

use morsel_core::{ActionId, MessageClass, PendingAction, Reachability, ReplayOutcome};

use crate::handler::{ReplayFuture, ReplayHandler};
use crate::notify::{Notification, Notifier};
use crate::probe::{ProbeFuture, Prober};

/// Answers every probe with the current reading.
pub struct MockProber {
    reading: Mutex<Reachability>,
    calls: AtomicUsize,
}

impl MockProber {
    pub fn new(reading: Reachability) -> Arc<Self> {
        Arc::new(MockProber { reading: Mutex::new(reading), calls: AtomicUsize::new(0) })
    }

    pub fn set(&self, reading: Reachability) {
        *self.reading.lock().unwrap() = reading;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Prober for MockProber {
    fn probe(&self) -> ProbeFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reading = *self.reading.lock().unwrap();
        Box::pin(async move { reading })
    }
}

/// Records calls; answers from a per-action script, defaulting to success.
#[derive(Default)]
pub struct ScriptedHandler {
    calls: Mutex<Vec<u64>>,
    script: Mutex<HashMap<u64, VecDeque<ReplayOutcome>>>,
    always: Mutex<HashMap<u64, ReplayOutcome>>,
}

impl ScriptedHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The next replay of action `id` yields `outcome`.
    pub fn then(&self, id: u64, outcome: ReplayOutcome) {
        self.script.lock().unwrap().entry(id).or_default().push_back(outcome);
    }

    /// Every replay of action `id` yields `outcome` once the script is used up.
    pub fn always(&self, id: u64, outcome: ReplayOutcome) {
        self.always.lock().unwrap().insert(id, outcome);
    }

    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReplayHandler for ScriptedHandler {
    fn replay(&self, action: PendingAction) -> ReplayFuture<'_> {
        let id = action.id.0;
        self.calls.lock().unwrap().push(id);
        let scripted = self.script.lock().unwrap().get_mut(&id).and_then(VecDeque::pop_front);
        let outcome = scripted
            .or_else(|| self.always.lock().unwrap().get(&id).cloned())
            .unwrap_or(ReplayOutcome::Succeeded);
        Box::pin(async move { outcome })
    }
}

/// Blocks each replay until the test releases it.
pub struct GatedHandler {
    started: mpsc::UnboundedSender<ActionId>,
    gate: Arc<Semaphore>,
}

impl GatedHandler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ActionId>) {
        let (started, rx) = mpsc::unbounded_channel();
        (Arc::new(GatedHandler { started, gate: Arc::new(Semaphore::new(0)) }), rx)
    }

    /// Let one blocked replay complete successfully.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

impl ReplayHandler for GatedHandler {
    fn replay(&self, action: PendingAction) -> ReplayFuture<'_> {
        let _ = self.started.send(action.id);
        let gate = Arc::clone(&self.gate);
        Box::pin(async move {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
            ReplayOutcome::Succeeded
        })
    }
}

/// Panics on its first probe, then reports the backend reachable.
#[derive(Default)]
pub struct CrashOnceProber {
    calls: AtomicUsize,
}

impl CrashOnceProber {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Prober for CrashOnceProber {
    #[allow(clippy::panic)]
    fn probe(&self) -> ProbeFuture<'_> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("prober crashed");
        }
        Box::pin(async { Reachability::Reachable })
    }
}

/// Panics on the first replay it sees, then succeeds.
#[derive(Default)]
pub struct CrashOnceHandler {
    calls: Mutex<Vec<u64>>,
}

impl CrashOnceHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReplayHandler for CrashOnceHandler {
    #[allow(clippy::panic)]
    fn replay(&self, action: PendingAction) -> ReplayFuture<'_> {
        let first = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(action.id.0);
            calls.len() == 1
        };
        Box::pin(async move {
            if first {
                panic!("handler crashed on {}", action.id);
            }
            ReplayOutcome::Succeeded
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
    announced: Mutex<Vec<String>>,
    failed: Mutex<Vec<(ActionId, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn classes(&self) -> Vec<MessageClass> {
        self.shown.lock().unwrap().iter().map(|n| n.class).collect()
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().unwrap().clone()
    }

    pub fn announced(&self) -> Vec<String> {
        self.announced.lock().unwrap().clone()
    }

    pub fn failed(&self) -> Vec<(ActionId, String)> {
        self.failed.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, notification: &Notification) {
        self.shown.lock().unwrap().push(notification.clone());
    }

    fn announce(&self, text: &str) {
        self.announced.lock().unwrap().push(text.to_string());
    }

    fn action_failed(&self, action: &PendingAction, reason: &str) {
        self.failed.lock().unwrap().push((action.id, reason.to_string()));
    }
}
