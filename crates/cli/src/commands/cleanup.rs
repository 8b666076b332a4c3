// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cleanup::CleanupManager;
use crate::error::Result;

use super::{load, runtime, Services};

pub fn run(days: Option<u32>) -> Result<()> {
    let (dir, config) = load()?;
    let days = days.unwrap_or(config.agent.retention_days);
    let services = Services::open(&dir)?;
    let manager = CleanupManager::new(services.queue, services.clock, services.events);

    let deleted = runtime()?.block_on(manager.cleanup(days))?;
    println!(
        "Deleted {} synced record(s) older than {} day(s)",
        deleted, days
    );
    Ok(())
}
