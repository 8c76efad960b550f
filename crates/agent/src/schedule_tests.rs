// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[tokio::test(start_paused = true)]
async fn fires_after_delay() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _task = ScheduledTask::after(Duration::from_secs(30), &tx, "due");

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(rx.try_recv().is_err());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(rx.try_recv().unwrap(), "due");
}

#[tokio::test(start_paused = true)]
async fn cancel_prevents_delivery() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = ScheduledTask::after(Duration::from_secs(1), &tx, 1u32);
    task.cancel();
    assert!(task.is_cancelled());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn drop_cancels() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    drop(ScheduledTask::after(Duration::from_secs(1), &tx, 1u32));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn parent_cancellation_propagates() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let parent = CancellationToken::new();
    let task = ScheduledTask::after_within(&parent, Duration::from_secs(1), &tx, 1u32);

    parent.cancel();
    assert!(task.is_cancelled());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rx.try_recv().is_err());
}
