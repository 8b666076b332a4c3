// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tk_core::{format_timestamp, ClockQueue};

use crate::agent::is_agent_running;
use crate::cli::OutputFormat;
use crate::config::{db_path, Config};
use crate::error::Result;

use super::load;

/// A record that keeps failing to sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalledRecord {
    pub id: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub user_id: String,
    pub pending_count: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub agent_running: bool,
    pub stalled: Vec<StalledRecord>,
}

pub fn run(output: OutputFormat) -> Result<()> {
    let (dir, config) = load()?;
    let report = collect(&dir, &config)?;
    match output {
        OutputFormat::Text => print!("{}", format_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

pub fn collect(state_dir: &Path, config: &Config) -> Result<StatusReport> {
    let queue = ClockQueue::open(&db_path(state_dir))?;
    let stalled = queue
        .list_stalled(config.agent.escalate_after_attempts)?
        .into_iter()
        .map(|r| StalledRecord {
            id: r.id,
            attempts: r.sync_attempts,
            last_error: r.last_sync_error,
        })
        .collect();

    Ok(StatusReport {
        user_id: config.session.user_id.clone(),
        pending_count: queue.pending_count()?,
        last_sync_at: queue.last_sync_at()?,
        agent_running: is_agent_running(state_dir),
        stalled,
    })
}

pub fn format_text(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "user: {}", report.user_id);
    let _ = writeln!(out, "pending: {}", report.pending_count);
    let last = report
        .last_sync_at
        .as_ref()
        .map(format_timestamp)
        .unwrap_or_else(|| "never".to_string());
    let _ = writeln!(out, "last sync: {}", last);
    let agent = if report.agent_running {
        "running"
    } else {
        "stopped"
    };
    let _ = writeln!(out, "agent: {}", agent);

    if !report.stalled.is_empty() {
        let _ = writeln!(out, "\nstalled ({}):", report.stalled.len());
        for record in &report.stalled {
            let _ = write!(out, "  {}  attempts={}", record.id, record.attempts);
            if let Some(error) = &record.last_error {
                let _ = write!(out, "  error: {}", error);
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
