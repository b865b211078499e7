//! Black-box behavioral specifications for the supd process supervisor.
//!
//! Each module drives the real `Supervisor`/`ProcessManager` stack against
//! real child processes (`/bin/sleep`, `/bin/false`, a signal-ignoring
//! shell one-liner) rather than mocking the OS boundary. See tests/specs/
//! for per-scenario coverage.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/auth.rs"]
mod auth;
#[path = "specs/cli.rs"]
mod cli;
#[path = "specs/lifecycle.rs"]
mod lifecycle;
#[path = "specs/reload.rs"]
mod reload;
#[path = "specs/rotation.rs"]
mod rotation;
