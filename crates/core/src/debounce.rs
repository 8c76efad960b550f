// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Decides which connectivity changes are worth surfacing to the user.
//!
//! Only two message classes exist. `Degraded` covers both offline and
//! backend-unreachable; once shown it is suppressed for a cooldown window so a
//! flapping network does not produce an alert storm. `Restored` is exempt from
//! the cooldown but fires at most once per recovery episode, where an episode
//! opens when a `Degraded` message is shown.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::status::ConnectivityStatus;

/// Default cooldown between two `Degraded` messages.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageClass {
    Degraded,
    Restored,
}

/// Outcome of evaluating a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Surface a message of this class now.
    Show(MessageClass),
    /// A message would be due but falls inside the cooldown. The caller may
    /// re-check with [`NotificationDebouncer::resolve_deferred`] at `until`.
    Suppress { class: MessageClass, until: Instant },
    /// Nothing to say.
    Ignore,
}

#[derive(Debug, Clone)]
pub struct NotificationDebouncer {
    cooldown: Duration,
    last_degraded_at: Option<Instant>,
    last_restored_at: Option<Instant>,
    /// A `Degraded` message was shown and no `Restored` has followed yet.
    episode_open: bool,
}

impl Default for NotificationDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl NotificationDebouncer {
    pub fn new(cooldown: Duration) -> Self {
        NotificationDebouncer { cooldown, last_degraded_at: None, last_restored_at: None, episode_open: false }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn episode_open(&self) -> bool {
        self.episode_open
    }

    pub fn last_shown(&self, class: MessageClass) -> Option<Instant> {
        match class {
            MessageClass::Degraded => self.last_degraded_at,
            MessageClass::Restored => self.last_restored_at,
        }
    }

    /// Evaluate a status change. `previous` is `None` for the first status
    /// after startup.
    pub fn evaluate(
        &mut self,
        previous: Option<ConnectivityStatus>,
        next: ConnectivityStatus,
        now: Instant,
    ) -> Decision {
        if next.is_degraded() {
            if previous.is_some_and(|p| p.is_degraded()) {
                return Decision::Ignore;
            }
            return self.try_degraded(now);
        }

        if previous.is_some_and(|p| p.is_reachable()) || !self.episode_open {
            return Decision::Ignore;
        }
        self.episode_open = false;
        self.last_restored_at = Some(now);
        Decision::Show(MessageClass::Restored)
    }

    /// Re-check a suppressed `Degraded` message once its cooldown elapsed.
    pub fn resolve_deferred(&mut self, current: ConnectivityStatus, now: Instant) -> Decision {
        if !current.is_degraded() || self.episode_open {
            return Decision::Ignore;
        }
        self.try_degraded(now)
    }

    fn try_degraded(&mut self, now: Instant) -> Decision {
        if let Some(shown) = self.last_degraded_at {
            let until = shown + self.cooldown;
            if now < until {
                return Decision::Suppress { class: MessageClass::Degraded, until };
            }
        }
        self.last_degraded_at = Some(now);
        self.episode_open = true;
        Decision::Show(MessageClass::Degraded)
    }
}

#[cfg(test)]
#[path = "debounce_tests.rs"]
mod tests;
