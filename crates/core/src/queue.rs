// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable FIFO queue of deferred actions.
//!
//! Actions live in memory and are mirrored to a JSONL file, one action per
//! line. Enqueues append and fsync; every other mutation rewrites the file
//! atomically. The id sequence is kept in a sidecar `.seq` file so ids stay
//! monotonic across restarts and across `clear_all`.
//!
//! Persistence failures never fail a queue operation: the in-memory queue is
//! authoritative for the session, the failure is logged, and the next
//! mutation rewrites the whole file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::action::{ActionId, ActionKind, PendingAction, Terminal};
use crate::clock::{ClockSource, SystemClock};
use crate::error::{Error, Result};
use crate::jsonl;

/// The only owner of `PendingAction` records.
pub struct PendingActionQueue<C: ClockSource = SystemClock> {
    path: PathBuf,
    seq_path: PathBuf,
    actions: Vec<PendingAction>,
    next_id: ActionId,
    clock: C,
    /// Set when the file no longer mirrors memory.
    dirty: bool,
    /// Log a warning once the queue grows to this many actions.
    warn_len: Option<usize>,
    /// Held for the queue's lifetime; one owner per device.
    _lock: File,
}

impl PendingActionQueue<SystemClock> {
    /// Opens (or creates) the queue at `path` using the system clock.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: ClockSource> PendingActionQueue<C> {
    /// Opens (or creates) the queue at `path` with a custom clock source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueLocked`] if another process owns the queue.
    pub fn open_with_clock(path: &Path, clock: C) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock = acquire_lock(&sibling(path, "lock"))?;
        let seq_path = sibling(path, "seq");

        let (mut actions, dirty) = load_actions(path)?;
        actions.retain(|a| !a.is_terminal());
        actions.sort_by_key(|a| a.id);
        let before = actions.len();
        actions.dedup_by_key(|a| a.id);
        let dirty = dirty || actions.len() != before;

        let stored_seq = read_seq(&seq_path);
        let after_last = actions.last().map(|a| a.id.next()).unwrap_or(ActionId(1));
        let next_id = std::cmp::max(stored_seq.unwrap_or(ActionId(1)), after_last);

        tracing::debug!(path = %path.display(), pending = actions.len(), next_id = next_id.0, "opened pending queue");

        let mut queue = PendingActionQueue {
            path: path.to_path_buf(),
            seq_path,
            actions,
            next_id,
            clock,
            dirty,
            warn_len: None,
            _lock: lock,
        };
        if queue.dirty {
            queue.persist_all();
        }
        Ok(queue)
    }

    /// Set the queue length at which a growth warning is logged.
    pub fn set_warn_len(&mut self, warn_len: Option<usize>) {
        self.warn_len = warn_len;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Enqueue an action for later replay and return its id.
    ///
    /// The action is immediately persisted to disk.
    pub fn enqueue(&mut self, kind: ActionKind, payload: serde_json::Value) -> ActionId {
        let id = self.next_id;
        self.next_id = id.next();

        let action = PendingAction::new(id, kind, payload, self.clock.now_utc());
        self.write_seq();
        if self.dirty {
            self.actions.push(action);
            self.persist_all();
        } else {
            if let Err(e) = jsonl::append(&self.path, &action) {
                tracing::warn!(error = %e, id = id.0, "failed to persist queued action");
                self.dirty = true;
            }
            self.actions.push(action);
        }

        if self.warn_len == Some(self.actions.len()) {
            tracing::warn!(pending = self.actions.len(), "pending queue is growing while disconnected");
        }

        id
    }

    /// All queued actions in replay order, without removing them.
    pub fn peek_in_order(&self) -> &[PendingAction] {
        &self.actions
    }

    /// The next action to replay.
    pub fn get(&self, id: ActionId) -> Option<&PendingAction> {
        self.position(id).map(|i| &self.actions[i])
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.position(id).is_some()
    }

    /// Ids of every queued action, in replay order.
    pub fn ids(&self) -> Vec<ActionId> {
        self.actions.iter().map(|a| a.id).collect()
    }

    /// Remove a replayed action permanently. The returned record is stamped
    /// [`Terminal::Succeeded`].
    pub fn mark_succeeded(&mut self, id: ActionId) -> Option<PendingAction> {
        self.retire(id, Terminal::Succeeded)
    }

    /// Record a failed replay attempt. Returns the new attempt count.
    pub fn mark_failed_attempt(&mut self, id: ActionId) -> Option<u32> {
        let now = self.clock.now_utc();
        let index = self.position(id)?;
        let action = &mut self.actions[index];
        action.attempts = action.attempts.saturating_add(1);
        action.last_attempt_at = Some(now);
        let attempts = action.attempts;
        self.persist_all();
        Some(attempts)
    }

    /// Remove an action that will never be retried. The returned record is
    /// stamped [`Terminal::Abandoned`].
    pub fn abandon(&mut self, id: ActionId) -> Option<PendingAction> {
        self.retire(id, Terminal::Abandoned)
    }

    /// Discard every queued action. Returns how many were removed.
    ///
    /// This cannot be undone.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.actions.len();
        self.actions.clear();
        self.persist_all();
        removed
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// True if the file on disk is known to lag behind memory.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rewrite the file from memory, reporting failure to the caller.
    pub fn flush(&mut self) -> Result<()> {
        jsonl::write_all(&self.path, &self.actions)?;
        self.dirty = false;
        Ok(())
    }

    fn position(&self, id: ActionId) -> Option<usize> {
        self.actions.binary_search_by_key(&id, |a| a.id).ok()
    }

    fn retire(&mut self, id: ActionId, terminal: Terminal) -> Option<PendingAction> {
        let index = self.position(id)?;
        let mut action = self.actions.remove(index);
        self.persist_all();
        action.terminal = Some(terminal);
        Some(action)
    }

    fn persist_all(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to rewrite pending queue");
            self.dirty = true;
        }
    }

    fn write_seq(&self) {
        if let Err(e) = fs::write(&self.seq_path, self.next_id.0.to_string()) {
            tracing::warn!(error = %e, "failed to persist queue id sequence");
        }
    }
}

fn sibling(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(ext);
    path.with_file_name(name)
}

fn acquire_lock(lock_path: &Path) -> Result<File> {
    let file = OpenOptions::new().create(true).write(true).truncate(false).open(lock_path)?;
    file.try_lock_exclusive().map_err(|_| Error::QueueLocked(lock_path.display().to_string()))?;
    Ok(file)
}

fn read_seq(seq_path: &Path) -> Option<ActionId> {
    let raw = fs::read_to_string(seq_path).ok()?;
    raw.trim().parse::<u64>().ok().map(ActionId)
}

/// Load persisted actions. A corrupted file is preserved as `.corrupt` and the
/// readable lines are kept; the second value reports whether a rewrite is due.
fn load_actions(path: &Path) -> Result<(Vec<PendingAction>, bool)> {
    match jsonl::read_all::<PendingAction>(path) {
        Ok(actions) => Ok((actions, false)),
        Err(Error::CorruptedData(detail)) => {
            tracing::warn!(%detail, "pending queue file is corrupted, keeping readable entries");
            let backup = sibling(path, "corrupt");
            fs::copy(path, &backup)?;
            let raw = fs::read_to_string(path)?;
            let actions = raw
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| serde_json::from_str(line).ok())
                .collect();
            Ok((actions, true))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
