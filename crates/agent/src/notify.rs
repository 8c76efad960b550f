// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing connectivity messages.
//!
//! The debouncer in `morsel-core` decides *whether* to speak; this module
//! decides *what* to say and hands it to a [`Notifier`].

use morsel_core::{ConnectivityStatus, MessageClass, PendingAction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub class: MessageClass,
    pub status: ConnectivityStatus,
    pub title: &'static str,
    pub body: &'static str,
}

impl Notification {
    /// Message text for `class`, worded for the status current at show time.
    pub fn for_status(class: MessageClass, status: ConnectivityStatus) -> Self {
        let (title, body) = match (class, status) {
            (MessageClass::Degraded, ConnectivityStatus::Offline) => {
                ("You're offline", "Changes are saved and will sync when you reconnect.")
            }
            (MessageClass::Degraded, _) => {
                ("Can't reach Morsel", "Changes are saved and will sync once the service is back.")
            }
            (MessageClass::Restored, _) => ("Back online", "Syncing your saved changes."),
        };
        Notification { class, status, title, body }
    }

    /// A single sentence suitable for screen readers.
    pub fn announcement(&self) -> String {
        format!("{}. {}", self.title, self.body)
    }
}

/// Surfaces messages. Calls are fire-and-forget and must not block.
pub trait Notifier: Send + Sync {
    fn show(&self, notification: &Notification);

    /// Speak `text` through assistive technology.
    fn announce(&self, text: &str);

    /// An action was dropped after a permanent failure.
    fn action_failed(&self, action: &PendingAction, reason: &str);
}

/// Writes notifications to the log. Used by the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, notification: &Notification) {
        tracing::info!(
            class = ?notification.class,
            status = %notification.status,
            "{}: {}",
            notification.title,
            notification.body
        );
    }

    fn announce(&self, text: &str) {
        tracing::debug!(text, "announce");
    }

    fn action_failed(&self, action: &PendingAction, reason: &str) {
        tracing::warn!(id = %action.id, kind = %action.kind, reason, "could not sync change");
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
