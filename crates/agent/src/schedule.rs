// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellable delayed events.
//!
//! A [`ScheduledTask`] sends one event into the service's channel after a
//! delay unless it is cancelled first. Dropping the handle cancels it, so a
//! timer can never outlive the state it was scheduled for.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct ScheduledTask {
    token: CancellationToken,
}

impl ScheduledTask {
    /// Deliver `event` on `tx` after `delay`.
    pub fn after<T: Send + 'static>(delay: Duration, tx: &mpsc::UnboundedSender<T>, event: T) -> Self {
        Self::spawn(CancellationToken::new(), delay, tx.clone(), event)
    }

    /// Like [`ScheduledTask::after`], additionally cancelled with `parent`.
    pub fn after_within<T: Send + 'static>(
        parent: &CancellationToken,
        delay: Duration,
        tx: &mpsc::UnboundedSender<T>,
        event: T,
    ) -> Self {
        Self::spawn(parent.child_token(), delay, tx.clone(), event)
    }

    fn spawn<T: Send + 'static>(
        token: CancellationToken,
        delay: Duration,
        tx: mpsc::UnboundedSender<T>,
        event: T,
    ) -> Self {
        let task_token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(event);
                }
            }
        });
        ScheduledTask { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
