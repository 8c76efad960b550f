// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! morsel-agent: the async half of the connectivity subsystem.
//!
//! [`spawn`] starts the connectivity service on the current tokio runtime
//! and returns a [`ConnectivityHandle`]. The service watches the device link,
//! probes the backend, surfaces degraded/restored notifications and replays
//! the durable [`PendingActionQueue`](morsel_core::PendingActionQueue) once
//! the backend is reachable again.
//!
//! ```rust,ignore
//! let queue = PendingActionQueue::open(&config.queue_path(&state_dir))?;
//! let handle = morsel_agent::spawn(queue, collaborators, ServiceOptions::from_config(&config));
//!
//! if handle.is_reachable() {
//!     // call the backend directly
//! } else {
//!     handle.enqueue_if_offline(kind, payload).await;
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod env;
pub mod error;
pub mod global;
pub mod handle;
pub mod handler;
pub mod link;
pub mod logging;
pub mod notify;
pub mod probe;
pub mod schedule;
pub mod service;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use cli::Cli;
pub use config::Config;
pub use error::{AgentError, Result};
pub use handle::{ConnectivityHandle, EnqueueOutcome};
pub use handler::{HandlerRegistry, ReplayHandler};
pub use notify::{Notification, Notifier};
pub use probe::Prober;
pub use service::{spawn, Collaborators, ReplayEvent, ServiceOptions};
