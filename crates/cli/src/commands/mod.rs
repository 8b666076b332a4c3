// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod agent;
pub mod check;
pub mod cleanup;
pub mod clock;
pub mod init;
pub mod pending;
pub mod status;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use tk_core::{Clock, ClockQueue, SystemClock};

use crate::config::{db_path, state_dir, Config};
use crate::error::{Error, Result};
use crate::events::EventBus;
use crate::{share_queue, SharedQueue};

/// Load the configuration from the resolved state directory.
pub fn load() -> Result<(PathBuf, Config)> {
    let dir = state_dir();
    let config = Config::load(&dir)?;
    Ok((dir, config))
}

/// Single-threaded runtime for one-shot commands.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Runtime(format!("tokio: {}", e)))
}

/// What a one-shot command needs to drive the services.
pub struct Services {
    pub queue: SharedQueue,
    pub clock: Arc<dyn Clock>,
    pub events: EventBus,
}

impl Services {
    pub fn open(state_dir: &std::path::Path) -> Result<Self> {
        let queue = ClockQueue::open(&db_path(state_dir))?;
        Ok(Self::with_queue(queue, Arc::new(SystemClock)))
    }

    pub fn with_queue(queue: ClockQueue, clock: Arc<dyn Clock>) -> Self {
        let events = EventBus::new(Arc::clone(&clock));
        Services {
            queue: share_queue(queue),
            clock,
            events,
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;
