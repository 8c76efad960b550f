// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! morsel-remote: reference backend for the morsel offline replay protocol.
//!
//! Answers reachability pings and applies replayed actions, with switches
//! for refusing action kinds and for going silent. The agent's integration
//! tests run it in-process through [`RunningServer`].

pub mod server;
pub mod state;

pub use server::{run, serve, RunningServer};
pub use state::{AppliedAction, BackendState, Rejection};
