// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use tockrs::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    match &cli.command {
        Command::Agent { .. } => {
            tockrs::logging::init_agent(&tockrs::config::log_path(&tockrs::config::state_dir()))
        }
        _ => tockrs::logging::init_cli(),
    }
    if let Err(e) = tockrs::run(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
