// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Argument parsing tests, one file per command group.

use super::*;
