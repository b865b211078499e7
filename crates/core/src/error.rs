//! The error taxonomy surfaced by RPC replies and logged by the core.
//!
//! These are the kinds callers branch on; any lower-level I/O detail is
//! folded into `Failed` rather than leaked to the RPC boundary.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupdError {
    #[error("NOT_FOUND: no process named {0:?}")]
    NotFound(String),

    #[error("BAD_ARGUMENTS: {0}")]
    BadArguments(String),

    #[error("NOT_RUNNING")]
    NotRunning,

    #[error("NO_FILE")]
    NoFile,

    #[error("FAILED: {0}")]
    Failed(String),

    #[error("ALREADY_STARTED")]
    AlreadyStarted,

    #[error("NOT_STARTED")]
    NotStarted,

    #[error("SPAWN_ERROR: {0}")]
    SpawnFailed(String),
}

impl SupdError {
    /// The short symbolic name the RPC layer puts on the wire, mirroring
    /// the fault codes of the system being reimplemented.
    pub fn code(&self) -> &'static str {
        match self {
            SupdError::NotFound(_) => "NOT_FOUND",
            SupdError::BadArguments(_) => "BAD_ARGUMENTS",
            SupdError::NotRunning => "NOT_RUNNING",
            SupdError::NoFile => "NO_FILE",
            SupdError::Failed(_) => "FAILED",
            SupdError::AlreadyStarted => "ALREADY_STARTED",
            SupdError::NotStarted => "NOT_STARTED",
            SupdError::SpawnFailed(_) => "SPAWN_ERROR",
        }
    }
}

impl From<std::io::Error> for SupdError {
    fn from(err: std::io::Error) -> Self {
        SupdError::Failed(err.to_string())
    }
}

pub type SupdResult<T> = Result<T, SupdError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
