// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::capture::{CaptureError, CaptureService};
use crate::error::Result;

use super::{load, runtime, Services};

pub fn run() -> Result<()> {
    let (dir, config) = load()?;
    let services = Services::open(&dir)?;
    let service = CaptureService::new(services.queue, services.clock, services.events);

    let result = runtime()?.block_on(service.can_capture_offline(&config.session()));
    match result {
        Ok(()) => {
            println!("offline capture: available");
            Ok(())
        }
        Err(e) => {
            println!("offline capture: unavailable ({})", e.reason());
            Err(CaptureError::Precondition(e).into())
        }
    }
}
