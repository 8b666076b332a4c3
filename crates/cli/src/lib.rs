// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tockrs - offline-capable time-clock capture and sync.
//!
//! This crate provides the functionality behind the `tock` CLI: clock events
//! are captured into a local SQLite queue regardless of connectivity and a
//! sync agent later submits them to the remote endpoint.
//!
//! # Main Components
//!
//! - [`capture::CaptureService`] - records clock events locally
//! - [`sync::SyncOrchestrator`] - submits pending records and reconciles the result
//! - [`connectivity::ConnectivityMonitor`] - turns probe readings into sync triggers
//! - [`cleanup::CleanupManager`] - purges confirmed records past retention
//! - [`agent`] - the long-running task set behind `tock agent`

mod cli;
mod commands;

pub mod agent;
pub mod capture;
pub mod cleanup;
pub mod config;
pub mod connectivity;
pub mod env;
pub mod error;
pub mod events;
pub mod logging;
pub mod sync;

use std::sync::Arc;

pub use cli::{Cli, ClockArgs, Command, LocationArgs, OutputFormat};
pub use config::Config;
pub use error::{Error, Result};

use clap::CommandFactory;
use clap_complete::generate;
use tk_core::ClockQueue;

/// The local queue shared between capture, sync and cleanup.
///
/// The async mutex serializes every store access within the process.
pub type SharedQueue = Arc<tokio::sync::Mutex<ClockQueue>>;

/// Wrap an open queue for sharing.
pub fn share_queue(queue: ClockQueue) -> SharedQueue {
    Arc::new(tokio::sync::Mutex::new(queue))
}

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Init {
            user_id,
            user_name,
            token,
            store,
            remote,
        } => commands::init::run(user_id, user_name, token, store, remote),
        Command::Check => commands::check::run(),
        Command::In { args } => commands::clock::run(tk_core::ClockAction::ClockIn, args),
        Command::Out { args } => commands::clock::run(tk_core::ClockAction::ClockOut, args),
        Command::Status { output } => commands::status::run(output),
        Command::Pending { output } => commands::pending::run(output),
        Command::Sync { output } => commands::sync::run(output),
        Command::Cleanup { days } => commands::cleanup::run(days),
        Command::Agent { json } => commands::agent::run(json),
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "tock", &mut std::io::stdout());
            Ok(())
        }
    }
}
