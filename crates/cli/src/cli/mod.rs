// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

pub use args::{ClockArgs, LocationArgs};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "tock")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-capable time clock: capture now, sync when the network allows")]
#[command(
    long_about = "Offline-capable time clock.\n\n\
    Clock events are stored locally first and submitted to the remote endpoint \
    by 'tock sync' or the long-running 'tock agent'."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Set the identity and remote used for capture and sync
    #[command(after_help = "\
Examples:
  tock init --user-id emp-7 --user-name \"Mei Lin\"
  tock init --user-id emp-7 --user-name \"Mei Lin\" --token s3cret --store store-01
  tock init --user-id emp-7 --user-name \"Mei Lin\" --remote wss://clock.example.com/ws")]
    Init {
        /// Employee identifier
        #[arg(long, value_parser = non_empty_string)]
        user_id: String,

        /// Employee display name
        #[arg(long, value_parser = non_empty_string)]
        user_name: String,

        /// Auth token sent with every sync request
        #[arg(long)]
        token: Option<String>,

        /// Default store for captures
        #[arg(long, value_parser = non_empty_string)]
        store: Option<String>,

        /// WebSocket URL of the remote endpoint (ws:// or wss://)
        #[arg(long)]
        remote: Option<String>,
    },

    /// Report whether offline capture is possible right now
    Check,

    /// Clock in
    #[command(after_help = "\
Examples:
  tock in                               Clock in now at the default store
  tock in --store store-02              Clock in at another store
  tock in --at 2026-04-16T08:30:00Z     Clock in at an explicit time
  tock in --lat 52.52 --lon 13.40       Attach a location")]
    In {
        #[command(flatten)]
        args: ClockArgs,
    },

    /// Clock out
    Out {
        #[command(flatten)]
        args: ClockArgs,
    },

    /// Show pending count, last sync and stalled records
    Status {
        /// Output format
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// List records waiting to be confirmed
    Pending {
        /// Output format
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Run one sync pass now
    Sync {
        /// Output format
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Delete confirmed records older than the retention period
    Cleanup {
        /// Retention in days (defaults to agent.retention_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Run the sync agent in the foreground
    Agent {
        /// Print status events to stdout as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    #[command(arg_required_else_help = true)]
    Completion {
        /// Target shell
        shell: Shell,
    },
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
