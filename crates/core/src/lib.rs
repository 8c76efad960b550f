// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! morsel-core: connectivity and offline replay primitives for the morsel client.
//!
//! This crate holds the runtime-free half of the subsystem: the data model,
//! the durable pending-action queue, and the pure state machines that decide
//! connectivity status, notification surfacing, and replay progression. The
//! async wiring (probes, link monitoring, the service actor) lives in
//! `morsel-agent`.

pub mod action;
pub mod clock;
pub mod debounce;
pub mod error;
pub mod jsonl;
pub mod protocol;
pub mod queue;
pub mod reconcile;
pub mod replay;
pub mod status;

pub use action::{ActionId, ActionKind, PendingAction, Terminal};
pub use clock::{ClockSource, SystemClock};
pub use debounce::{Decision, MessageClass, NotificationDebouncer};
pub use error::{Error, Result};
pub use queue::PendingActionQueue;
pub use reconcile::{ConnectivityReconciler, Transition};
pub use replay::{FailureClass, ReplayOutcome, ReplayPolicy, ReplaySession, ReplayState, Verdict};
pub use status::{ConnectivityStatus, Reachability};
