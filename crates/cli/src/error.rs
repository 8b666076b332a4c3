// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::capture::CaptureError;

/// All possible errors that can occur in the tockrs library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'tock init --user-id <id> --user-name <name>' first")]
    NotInitialized,

    #[error("sync already running for {0}\n  hint: the sync agent or another 'tock sync' holds the lock")]
    AgentRunning(String),

    #[error("{field} cannot be empty")]
    FieldEmpty { field: &'static str },

    #[error("invalid timestamp: {reason}")]
    InvalidTimestamp { reason: String },

    #[error("invalid remote URL '{0}': must start with ws:// or wss://")]
    InvalidRemoteUrl(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Core(#[from] tk_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// A specialized Result type for tockrs operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
