// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Nothing listens here, so connections are refused immediately.
pub const UNREACHABLE_REMOTE: &str = "ws://127.0.0.1:1";

/// `tock` bound to `state` with a clean environment.
pub fn tock(state: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tock");
    cmd.env("TOCK_STATE_DIR", state.path())
        .env_remove("TOCK_AUTH_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create an initialized state directory.
pub fn init_state() -> TempDir {
    let state = TempDir::new().unwrap();
    tock(&state)
        .args(["init", "--user-id", "emp-7", "--user-name", "Mei Lin"])
        .args(["--token", "t0k", "--store", "store-01"])
        .args(["--remote", UNREACHABLE_REMOTE])
        .assert()
        .success();
    state
}

/// Helper to capture an event and return its id.
pub fn capture(state: &TempDir, action: &str, extra: &[&str]) -> String {
    let output = tock(state).arg(action).args(extra).output().unwrap();
    assert!(
        output.status.success(),
        "capture failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Parse the JSON printed by a command.
pub fn json_output(state: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = tock(state).args(args).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}
