// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! supd-daemon: ConfigView, the Supervisor orchestrator, and the RPC
//! control plane the `supd` binary wires together.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config_view;
pub mod log_sinks;
pub mod rpc;
pub mod supervisor;

pub use config_view::ConfigView;
pub use log_sinks::DirLogSinkFactory;
pub use rpc::{dispatch, serve, ProcessInfo, Request, Response, ResponseValue};
pub use supervisor::{ReloadReport, Supervisor};
