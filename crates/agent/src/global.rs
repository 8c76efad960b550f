// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide access to the running connectivity service.
//!
//! One writer (whoever calls [`init`]), any number of readers through
//! [`current`]. Tests and re-initialization go through [`reset`].

use std::sync::RwLock;

use crate::error::{AgentError, Result};
use crate::handle::ConnectivityHandle;

static CURRENT: RwLock<Option<ConnectivityHandle>> = RwLock::new(None);

/// Install `handle` as the process-wide service.
pub fn init(handle: ConnectivityHandle) -> Result<()> {
    let mut slot = CURRENT.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    if slot.as_ref().is_some_and(ConnectivityHandle::is_running) {
        return Err(AgentError::AlreadyInitialized);
    }
    *slot = Some(handle);
    Ok(())
}

pub fn current() -> Option<ConnectivityHandle> {
    CURRENT.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
}

/// Remove the installed handle, returning it so the caller may shut it down.
pub fn reset() -> Option<ConnectivityHandle> {
    CURRENT.write().unwrap_or_else(|poisoned| poisoned.into_inner()).take()
}

#[cfg(test)]
#[path = "global_tests.rs"]
mod tests;
