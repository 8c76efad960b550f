// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::handler::HandlerRegistry;
use crate::link::ManualLink;
use crate::service::{self, Collaborators, ServiceOptions};
use crate::test_support::{MockProber, RecordingNotifier};
use morsel_core::{PendingActionQueue, Reachability};
use tempfile::TempDir;

fn start(dir: &TempDir, name: &str, link: &ManualLink) -> ConnectivityHandle {
    let queue = PendingActionQueue::open(&dir.path().join(name)).unwrap();
    service::spawn(
        queue,
        Collaborators {
            link: link.subscribe(),
            prober: MockProber::new(Reachability::Reachable),
            handlers: HandlerRegistry::new(),
            notifier: RecordingNotifier::new(),
        },
        ServiceOptions::default(),
    )
}

// One test owns the process-wide slot so nothing races on it.
#[tokio::test]
async fn init_current_and_reset() {
    let dir = TempDir::new().unwrap();
    let link = ManualLink::new(false);
    reset();
    assert!(current().is_none());

    let first = start(&dir, "a.jsonl", &link);
    init(first.clone()).unwrap();
    assert!(current().is_some_and(|h| h.is_running()));

    let second = start(&dir, "b.jsonl", &link);
    assert!(matches!(init(second.clone()), Err(AgentError::AlreadyInitialized)));

    first.shutdown().await;
    init(second.clone()).unwrap();

    let taken = reset().unwrap();
    assert!(current().is_none());
    taken.shutdown().await;
    assert!(!second.is_running());
}
