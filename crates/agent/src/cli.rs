// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "morsel-agent")]
#[command(version, about = "Connectivity monitor and offline replay queue for the morsel client")]
pub struct Cli {
    /// Path to morsel.toml (default: <state-dir>/morsel.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// State directory holding the queue and logs
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Write logs to <state-dir>/agent.log instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch connectivity and replay queued actions until interrupted
    Run,

    /// Probe the backend once and print the connectivity status
    Status,

    /// Inspect or edit the pending action queue
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// List queued actions in replay order
    List {
        /// Print the actions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Discard every queued action
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Queue an action for replay
    Add {
        /// Action kind, e.g. meal_log.create
        kind: String,
        /// JSON payload handed to the replay handler
        payload: String,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
