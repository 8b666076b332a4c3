// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use tk_core::{ClockAction, GeoPoint};

use crate::capture::{CaptureInput, CaptureReceipt, CaptureService};
use crate::cli::{ClockArgs, LocationArgs};
use crate::config::Config;
use crate::error::{Error, Result};

use super::{load, runtime, Services};

pub fn run(action: ClockAction, args: ClockArgs) -> Result<()> {
    let (dir, config) = load()?;
    let services = Services::open(&dir)?;
    let receipt = runtime()?.block_on(capture(&services, &config, action, args))?;
    println!("{}", receipt.record_id);
    Ok(())
}

/// Turn parsed arguments into a capture and queue it.
pub async fn capture(
    services: &Services,
    config: &Config,
    action: ClockAction,
    args: ClockArgs,
) -> Result<CaptureReceipt> {
    let input = build_input(config, action, args)?;
    let service = CaptureService::new(
        services.queue.clone(),
        services.clock.clone(),
        services.events.clone(),
    );
    let receipt = service.capture(&config.session(), input).await?;
    tracing::debug!(record_id = %receipt.record_id, action = %action, "captured");
    Ok(receipt)
}

fn build_input(config: &Config, action: ClockAction, args: ClockArgs) -> Result<CaptureInput> {
    let store = args
        .store
        .or_else(|| config.store_id.clone())
        .filter(|s| !s.trim().is_empty())
        .ok_or(Error::FieldEmpty { field: "store" })?;

    let mut input = CaptureInput::new(action, store);
    if let Some(at) = args.at.as_deref() {
        input = input.at(parse_timestamp(at)?);
    }
    if let Some(location) = parse_location(&args.location)? {
        input = input.with_location(location);
    }
    Ok(input)
}

/// Parse an RFC 3339 timestamp, normalized to UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::InvalidTimestamp {
            reason: format!("'{}': {}", s, e),
        })
}

fn parse_location(args: &LocationArgs) -> Result<Option<GeoPoint>> {
    match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Ok(Some(GeoPoint::new(lat, lon, args.accuracy)?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
