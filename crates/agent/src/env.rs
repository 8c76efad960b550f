// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.

use std::path::PathBuf;

pub mod vars {
    pub const MORSEL_STATE_DIR: &str = "MORSEL_STATE_DIR";
    pub const MORSEL_CONFIG: &str = "MORSEL_CONFIG";
    pub const XDG_STATE_HOME: &str = "XDG_STATE_HOME";
}

/// Returns the value of `MORSEL_STATE_DIR` if set.
pub fn state_dir() -> Option<PathBuf> {
    std::env::var(vars::MORSEL_STATE_DIR).ok().map(PathBuf::from)
}

/// Returns the value of `MORSEL_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    std::env::var(vars::MORSEL_CONFIG).ok().map(PathBuf::from)
}

/// Returns the value of `XDG_STATE_HOME` if set.
pub fn xdg_state_home() -> Option<PathBuf> {
    std::env::var(vars::XDG_STATE_HOME).ok().map(PathBuf::from)
}
