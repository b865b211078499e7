//! The RPC control plane: request/reply contracts, authentication, and the
//! transports (Unix socket + TCP) both multiplex onto the same handler set.

mod auth;
mod dispatch;
mod transport;
mod types;
mod wire;

pub use dispatch::dispatch;
pub use transport::serve;
pub use types::{ProcessInfo, Request, Response, ResponseValue};
