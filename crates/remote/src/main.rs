// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tk-remote: reference sync endpoint for tock clients.
//!
//! Accepts batches of offline clock records over WebSocket, validates them
//! per record and stores accepted ones in a SQLite ledger. Resubmitting an
//! offline id returns the server id assigned the first time.

mod ledger;
mod server;
#[cfg(test)]
mod server_tests;
mod state;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use state::parse_token_pair;

/// Upper bound for `--max-skew-secs` (one year).
const MAX_SKEW_SECS: i64 = 365 * 24 * 60 * 60;

/// tk-remote: reference sync endpoint for tock clients
#[derive(Parser, Debug)]
#[command(name = "tk-remote")]
#[command(about = "Reference WebSocket endpoint for tock clock-record sync")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory for the ledger database
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Accepted credential as USER_ID=TOKEN (repeatable)
    #[arg(short, long = "token", value_name = "USER_ID=TOKEN", value_parser = parse_token_pair)]
    tokens: Vec<(String, String)>,

    /// Reject timestamps further than this into the future
    #[arg(long, default_value = "300", value_parser = clap::value_parser!(i64).range(0..=MAX_SKEW_SECS))]
    max_skew_secs: i64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting tk-remote server");
    info!("  Bind address: {}", args.bind);
    info!("  Data directory: {}", args.data.display());
    info!("  Known users: {}", args.tokens.len());

    let tokens: HashMap<String, String> = args
        .tokens
        .into_iter()
        .map(|(user, token)| (token, user))
        .collect();
    let max_skew = chrono::TimeDelta::try_seconds(args.max_skew_secs)
        .ok_or("max skew out of range")?;

    let state = state::ServerState::new(&args.data, tokens, max_skew)?;
    server::run(args.bind, state).await?;

    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
