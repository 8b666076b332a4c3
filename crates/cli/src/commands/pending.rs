// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt::Write as _;

use tk_core::{format_timestamp, ClockQueue, OfflineClockRecord};

use crate::cli::OutputFormat;
use crate::config::db_path;
use crate::error::Result;

use super::load;

pub fn run(output: OutputFormat) -> Result<()> {
    let (dir, _config) = load()?;
    let records = ClockQueue::open(&db_path(&dir))?.list_unsynced()?;
    match output {
        OutputFormat::Text => print!("{}", format_text(&records)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
    }
    Ok(())
}

/// One line per record, oldest first.
pub fn format_text(records: &[OfflineClockRecord]) -> String {
    if records.is_empty() {
        return "No pending records\n".to_string();
    }
    let mut out = String::new();
    for record in records {
        let _ = write!(
            out,
            "{}  {:<9}  {}  {}",
            record.id,
            record.action.as_str(),
            format_timestamp(&record.timestamp),
            record.store_id
        );
        if record.sync_attempts > 0 {
            let _ = write!(out, "  attempts={}", record.sync_attempts);
        }
        if let Some(error) = &record.last_sync_error {
            let _ = write!(out, "  error: {}", error);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
