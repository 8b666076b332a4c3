// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use tk_core::{ClockQueue, SessionContext};

use crate::config::{db_path, state_dir, Config};
use crate::error::Result;

pub fn run(
    user_id: String,
    user_name: String,
    token: Option<String>,
    store: Option<String>,
    remote: Option<String>,
) -> Result<()> {
    let dir = state_dir();
    let config = init_in(&dir, user_id, user_name, token, store, remote)?;

    println!(
        "Initialized tock for {} ({})",
        config.session.user_name, config.session.user_id
    );
    println!("State: {}", dir.display());
    println!("Remote: {}", config.remote.url);
    if let Some(store) = &config.store_id {
        println!("Store: {}", store);
    }
    if !config.session.is_authenticated() {
        println!("hint: no auth token set; pass --token or set TOCK_AUTH_TOKEN before syncing");
    }
    Ok(())
}

/// Write the identity into `state_dir`, keeping unrelated settings from an
/// existing config, and create the queue.
///
/// Re-running for the same user keeps the stored token unless a new one is
/// given.
pub fn init_in(
    state_dir: &Path,
    user_id: String,
    user_name: String,
    token: Option<String>,
    store: Option<String>,
    remote: Option<String>,
) -> Result<Config> {
    let mut config = if Config::exists(state_dir) {
        Config::load(state_dir)?
    } else {
        Config::default()
    };

    let kept_token = if config.session.user_id == user_id {
        config.session.auth_token.take()
    } else {
        None
    };
    let mut session = SessionContext::new(user_id.trim(), user_name.trim());
    session.auth_token = token.or(kept_token);
    config.session = session;

    if let Some(store) = store {
        config.store_id = Some(store.trim().to_string());
    }
    if let Some(url) = remote {
        config.remote.url = url;
    }
    config.remote.validate_url()?;

    config.save(state_dir)?;
    ClockQueue::open(&db_path(state_dir))?;
    tracing::debug!(state_dir = %state_dir.display(), "initialized");
    Ok(config)
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
