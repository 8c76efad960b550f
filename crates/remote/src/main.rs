// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! morsel-remote: reference WebSocket backend for morsel replay.

use std::net::SocketAddr;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use morsel_remote::BackendState;

/// morsel-remote: backend answering probes and replayed actions
#[derive(Parser, Debug)]
#[command(name = "morsel-remote")]
#[command(about = "Reference WebSocket backend for morsel offline replay")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Permanently refuse an action kind (KIND=REASON, repeatable)
    #[arg(long, value_name = "KIND=REASON", value_parser = parse_rule)]
    reject: Vec<(String, String)>,

    /// Refuse an action kind as retryable (KIND=REASON, repeatable)
    #[arg(long, value_name = "KIND=REASON", value_parser = parse_rule)]
    throttle: Vec<(String, String)>,
}

fn parse_rule(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((kind, reason)) if !kind.trim().is_empty() => Ok((kind.trim().to_string(), reason.to_string())),
        _ => Err(format!("expected KIND=REASON, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting morsel-remote server");
    info!("  Bind address: {}", args.bind);

    let state = BackendState::new();
    for (kind, reason) in &args.reject {
        info!("  Rejecting: {} ({})", kind, reason);
        state.reject(kind, reason, false);
    }
    for (kind, reason) in &args.throttle {
        info!("  Throttling: {} ({})", kind, reason);
        state.reject(kind, reason, true);
    }

    morsel_remote::run(args.bind, state).await?;

    Ok(())
}
