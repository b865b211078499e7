//! Symbolic signal names used in `stop_signals` and `SignalProcess`.

use nix::sys::signal::Signal as NixSignal;
use serde::{Deserialize, Serialize};

use crate::error::SupdError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Term,
    Hup,
    Int,
    Quit,
    Usr1,
    Usr2,
    Kill,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Term => "TERM",
            Signal::Hup => "HUP",
            Signal::Int => "INT",
            Signal::Quit => "QUIT",
            Signal::Usr1 => "USR1",
            Signal::Usr2 => "USR2",
            Signal::Kill => "KILL",
        }
    }

    pub fn parse(name: &str) -> Result<Self, SupdError> {
        let upper = name.trim().to_ascii_uppercase();
        let stripped = upper.strip_prefix("SIG").unwrap_or(&upper);
        match stripped {
            "TERM" => Ok(Signal::Term),
            "HUP" => Ok(Signal::Hup),
            "INT" => Ok(Signal::Int),
            "QUIT" => Ok(Signal::Quit),
            "USR1" => Ok(Signal::Usr1),
            "USR2" => Ok(Signal::Usr2),
            "KILL" => Ok(Signal::Kill),
            other => Err(SupdError::BadArguments(format!("unknown signal {other:?}"))),
        }
    }

    pub fn to_nix(self) -> NixSignal {
        match self {
            Signal::Term => NixSignal::SIGTERM,
            Signal::Hup => NixSignal::SIGHUP,
            Signal::Int => NixSignal::SIGINT,
            Signal::Quit => NixSignal::SIGQUIT,
            Signal::Usr1 => NixSignal::SIGUSR1,
            Signal::Usr2 => NixSignal::SIGUSR2,
            Signal::Kill => NixSignal::SIGKILL,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
