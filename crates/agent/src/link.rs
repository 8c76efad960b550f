// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Device link state: is there any network path at all?
//!
//! The service consumes link state as a `watch::Receiver<bool>`. Where that
//! comes from is pluggable:
//! - [`DeviceLinkMonitor`] polls a [`LinkSource`] and publishes changes
//! - [`ManualLink`] is driven directly by the embedding application (or tests)

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// A synchronous reading of link state.
pub trait LinkSource: Send + Sync {
    fn is_up(&self) -> bool;
}

/// Reads `/sys/class/net/<iface>/operstate`.
#[derive(Debug, Clone)]
pub struct SysfsLinkSource {
    root: PathBuf,
    interface: Option<String>,
}

impl SysfsLinkSource {
    pub const DEFAULT_ROOT: &'static str = "/sys/class/net";

    pub fn new(interface: Option<String>) -> Self {
        Self::with_root(Self::DEFAULT_ROOT, interface)
    }

    pub fn with_root(root: impl Into<PathBuf>, interface: Option<String>) -> Self {
        SysfsLinkSource { root: root.into(), interface }
    }

    fn interface_up(dir: &Path) -> bool {
        match fs::read_to_string(dir.join("operstate")) {
            Ok(state) => state.trim() == "up",
            Err(_) => false,
        }
    }
}

impl LinkSource for SysfsLinkSource {
    fn is_up(&self) -> bool {
        if let Some(name) = &self.interface {
            return Self::interface_up(&self.root.join(name));
        }
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(root = %self.root.display(), error = %e, "cannot read link state");
                return false;
            }
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name() != "lo")
            .any(|entry| Self::interface_up(&entry.path()))
    }
}

/// Always reports a link. Reachability probes then carry all the signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysUp;

impl LinkSource for AlwaysUp {
    fn is_up(&self) -> bool {
        true
    }
}

/// Polls a [`LinkSource`] and publishes changes.
///
/// Dropping the monitor stops polling; receivers then see the channel close.
pub struct DeviceLinkMonitor {
    rx: watch::Receiver<bool>,
    token: CancellationToken,
}

impl DeviceLinkMonitor {
    pub fn spawn(source: Arc<dyn LinkSource>, poll_interval: Duration) -> Self {
        let (tx, rx) = watch::channel(source.is_up());
        let token = CancellationToken::new();
        let task_token = token.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let up = source.is_up();
                        let changed = tx.send_if_modified(|current| {
                            if *current == up {
                                return false;
                            }
                            *current = up;
                            true
                        });
                        if changed {
                            tracing::debug!(up, "link state changed");
                        }
                    }
                }
            }
        });

        DeviceLinkMonitor { rx, token }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }
}

impl Drop for DeviceLinkMonitor {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Link state set by hand.
#[derive(Debug, Clone)]
pub struct ManualLink {
    tx: Arc<watch::Sender<bool>>,
}

impl ManualLink {
    pub fn new(initially_up: bool) -> Self {
        let (tx, _) = watch::channel(initially_up);
        ManualLink { tx: Arc::new(tx) }
    }

    pub fn set(&self, up: bool) {
        self.tx.send_if_modified(|current| {
            if *current == up {
                return false;
            }
            *current = up;
            true
        });
    }

    pub fn is_up(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[path = "link_tests.rs"]
mod tests;
