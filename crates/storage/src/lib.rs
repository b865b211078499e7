// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! supd-log: the rotating log writer/reader each Process owns for its
//! stdout and stderr capture.

mod rotating_log;
mod size;

pub use rotating_log::RotatingLog;
pub use size::{format_size, parse_size};
