// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde::Serialize;

use crate::agent::{acquire_lock, build_orchestrator};
use crate::cli::OutputFormat;
use crate::config::lock_path;
use crate::connectivity::SharedConnectivity;
use crate::error::Result;
use crate::sync::{SyncOutcome, Trigger};

use super::{load, runtime, Services};

/// Result of `tock sync`, with the queue size after the pass.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    #[serde(rename = "result")]
    pub outcome: SyncOutcome,
    pub pending_count: usize,
}

/// Runs one manual pass. Transport failures are reported, not returned.
pub fn run(output: OutputFormat) -> Result<()> {
    let (dir, config) = load()?;
    config.remote.validate_url()?;
    let _lock = acquire_lock(&lock_path(&dir))?;

    let services = Services::open(&dir)?;
    let orchestrator = build_orchestrator(
        &config,
        services.queue.clone(),
        Arc::new(SharedConnectivity::new()),
        services.events.clone(),
        services.clock.clone(),
    );

    let summary = runtime()?.block_on(async {
        let outcome = orchestrator.sync_pass(Trigger::Manual).await?;
        let pending_count = services.queue.lock().await.pending_count()?;
        Ok::<_, crate::error::Error>(SyncSummary {
            outcome,
            pending_count,
        })
    })?;

    match output {
        OutputFormat::Text => println!("{}", format_text(&summary)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

pub fn format_text(summary: &SyncSummary) -> String {
    match &summary.outcome {
        SyncOutcome::Skipped { reason } => {
            format!("Sync skipped: {}", reason.as_str())
        }
        SyncOutcome::Completed(report) => format!(
            "Synced {} record(s), {} rejected, {} pending",
            report.processed, report.errors, report.pending_count
        ),
        SyncOutcome::TransportFailed { message } => format!(
            "Sync failed: {}\n{} record(s) still pending",
            message, summary.pending_count
        ),
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
