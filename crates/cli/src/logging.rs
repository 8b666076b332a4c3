// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup.
//!
//! `RUST_LOG` overrides the default level in both modes.

use std::fs;
use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::env;

/// Default filter for one-shot commands.
pub const CLI_DEFAULT_FILTER: &str = "warn";

/// Default filter for the sync agent.
pub const AGENT_DEFAULT_FILTER: &str = "info";

fn filter_or(default: &str) -> EnvFilter {
    if !env::rust_log_set() {
        return EnvFilter::new(default);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to stderr for one-shot commands.
pub fn init_cli() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or(CLI_DEFAULT_FILTER))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log to `log_path` for the agent, falling back to stderr when the file
/// cannot be opened.
pub fn init_agent(log_path: &Path) {
    let filter = filter_or(AGENT_DEFAULT_FILTER);

    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    if let Ok(file) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
