// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument structs for the capture commands.
//!
//! `tock in` and `tock out` take the same arguments via `#[command(flatten)]`.

use clap::Args;

/// Arguments for `tock in` / `tock out`.
#[derive(Args, Clone, Debug, Default)]
pub struct ClockArgs {
    /// Store to clock at (defaults to the configured store)
    #[arg(long, short)]
    pub store: Option<String>,

    /// Event time as RFC 3339 (defaults to now)
    #[arg(long, value_name = "RFC3339")]
    pub at: Option<String>,

    #[command(flatten)]
    pub location: LocationArgs,
}

/// Optional location attached to a capture.
#[derive(Args, Clone, Debug, Default)]
pub struct LocationArgs {
    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lon: Option<f64>,

    /// Horizontal accuracy in meters
    #[arg(long, requires = "lat")]
    pub accuracy: Option<f64>,
}
