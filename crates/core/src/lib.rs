// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tk-core: Shared library for the tock offline time clock
//!
//! This crate provides the clock record model, the local durable queue, and
//! the sync wire protocol used by both the tock CLI and the tk-remote
//! reference endpoint.

pub mod clock;
pub mod error;
pub mod id;
pub mod protocol;
pub mod queue;
pub mod record;
pub mod session;

pub use clock::{format_timestamp, Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use protocol::{ClientMessage, ServerMessage, SyncRequest, SyncResponse, WireRecord};
pub use queue::ClockQueue;
pub use record::{ClockAction, GeoPoint, OfflineClockRecord};
pub use session::SessionContext;
