// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::agent::run_agent;
use crate::error::Result;

use super::load;

pub fn run(json: bool) -> Result<()> {
    let (dir, config) = load()?;
    run_agent(&dir, &config, json)
}
