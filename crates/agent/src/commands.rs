// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations for the `morsel-agent` binary.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use morsel_core::{ActionKind, ConnectivityReconciler, PendingActionQueue, Reachability};

use crate::cli::{Cli, Command, QueueCommand};
use crate::config::{self, Config, LinkKind, LOG_FILE_NAME};
use crate::error::{AgentError, Result};
use crate::global;
use crate::handler::{HandlerRegistry, WebSocketForwarder};
use crate::link::{AlwaysUp, DeviceLinkMonitor, LinkSource, SysfsLinkSource};
use crate::logging;
use crate::notify::TracingNotifier;
use crate::probe;
use crate::service::{self, Collaborators, ServiceOptions};

/// Resolved locations and settings shared by every command.
struct Context {
    state_dir: PathBuf,
    config: Config,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let state_dir = config::resolve_state_dir(cli.state_dir.as_deref());
        let config_path = config::resolve_config_path(cli.config.as_deref(), &state_dir);
        let config = Config::load_or_default(&config_path)?;
        Ok(Context { state_dir, config })
    }

    fn open_queue(&self) -> Result<PendingActionQueue> {
        let mut queue = PendingActionQueue::open(&self.config.queue_path(&self.state_dir))?;
        queue.set_warn_len(Some(self.config.queue.warn_len));
        Ok(queue)
    }

    fn link_source(&self) -> Arc<dyn LinkSource> {
        match self.config.link.source {
            LinkKind::Sysfs => Arc::new(SysfsLinkSource::new(self.config.link.interface.clone())),
            LinkKind::AlwaysUp => Arc::new(AlwaysUp),
        }
    }
}

pub async fn execute(cli: Cli) -> Result<()> {
    let ctx = Context::load(&cli)?;

    // One-shot commands stay quiet unless asked.
    let level = if matches!(cli.command, Command::Run) { "info" } else { "warn" };
    let log_path = cli.log_file.then(|| ctx.state_dir.join(LOG_FILE_NAME));
    logging::setup_logging(log_path.as_deref(), level)?;

    match cli.command {
        Command::Run => run(&ctx).await,
        Command::Status => status(&ctx).await,
        Command::Queue { command } => queue(&ctx, command),
    }
}

async fn run(ctx: &Context) -> Result<()> {
    let queue = ctx.open_queue()?;
    let prober = probe::from_url(ctx.config.probe_target())?;
    let monitor =
        DeviceLinkMonitor::spawn(ctx.link_source(), Duration::from_millis(ctx.config.link.poll_interval_ms));
    let handlers =
        HandlerRegistry::new().with_fallback(Arc::new(WebSocketForwarder::new(ctx.config.backend_url.clone())));

    let handle = service::spawn(
        queue,
        Collaborators {
            link: monitor.subscribe(),
            prober,
            handlers,
            notifier: Arc::new(TracingNotifier),
        },
        ServiceOptions::from_config(&ctx.config),
    );
    global::init(handle.clone())?;
    tracing::info!(state_dir = %ctx.state_dir.display(), backend = %ctx.config.backend_url, "agent running");

    let mut status = handle.subscribe_status();
    let mut queued = handle.subscribe_queue_size();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    loop {
        tokio::select! {
            result = &mut interrupted => {
                result?;
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("status: {}", *status.borrow_and_update());
            }
            changed = queued.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("queued: {}", *queued.borrow_and_update());
            }
        }
    }

    handle.shutdown().await;
    global::reset();
    drop(monitor);
    Ok(())
}

async fn status(ctx: &Context) -> Result<()> {
    let up = ctx.link_source().is_up();
    let reachability = if up {
        let prober = probe::from_url(ctx.config.probe_target())?;
        probe::probe_within(prober.as_ref(), Duration::from_millis(ctx.config.probe.timeout_ms)).await
    } else {
        Reachability::Indeterminate
    };
    println!("status: {}", ConnectivityReconciler::derive(up, reachability));

    match ctx.open_queue() {
        Ok(queue) => println!("queued: {}", queue.len()),
        Err(crate::AgentError::Core(morsel_core::Error::QueueLocked(_))) => {
            println!("queued: (held by a running agent)")
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

fn queue(ctx: &Context, command: QueueCommand) -> Result<()> {
    let mut queue = ctx.open_queue()?;
    match command {
        QueueCommand::List { json } => {
            let actions = queue.peek_in_order();
            if json {
                println!("{}", serde_json::to_string_pretty(actions)?);
            } else if actions.is_empty() {
                println!("queue is empty");
            } else {
                for action in actions {
                    println!(
                        "{}\t{}\tattempts={}\t{}\t{}",
                        action.id,
                        action.kind,
                        action.attempts,
                        action.created_at.format("%Y-%m-%d %H:%M:%S"),
                        action.payload
                    );
                }
            }
        }
        QueueCommand::Clear { yes } => {
            let pending = queue.len();
            if pending > 0 && !yes && !confirm_clear(pending)? {
                println!("kept {pending} queued action(s)");
                return Ok(());
            }
            let count = queue.clear_all();
            println!("cleared {count} queued action(s)");
        }
        QueueCommand::Add { kind, payload } => {
            let kind = ActionKind::new(kind)?;
            let payload: serde_json::Value = serde_json::from_str(&payload)?;
            let id = queue.enqueue(kind, payload);
            println!("queued {id}");
        }
    }
    queue.flush()?;
    Ok(())
}

/// Ask before discarding queued actions. Without a terminal there is nobody
/// to ask, so `--yes` is required.
fn confirm_clear(pending: usize) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Err(AgentError::ConfirmationRequired(pending));
    }
    print!("Discard {pending} queued action(s)? They will never be sent. [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
