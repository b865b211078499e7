//! The configuration snapshot a Process is constructed from. This is the
//! typed, already-parsed shape the config collaborator hands to the core —
//! not the on-disk format, which is out of scope here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::signal::Signal;
use crate::state::AutoRestart;

/// One declared program entry, fully resolved: no `%(key)s` interpolation
/// left unexpanded, no include-glob references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub name: String,
    pub group: String,
    pub command: String,
    pub directory: Option<String>,
    pub environment: Vec<(String, String)>,
    pub user: Option<String>,
    pub process_num: u32,
    pub start_retries: u32,
    pub auto_start: bool,
    pub auto_restart: AutoRestart,
    pub exit_codes: HashSet<i32>,
    pub start_seconds: u64,
    pub stop_signals: Vec<Signal>,
    pub stop_wait_seconds: u64,
    pub stdout_logfile: Option<String>,
    pub stderr_logfile: Option<String>,
    pub capture_max_bytes: usize,
}

impl ProcessConfig {
    /// A process with no on-disk counterpart still needs a group to
    /// signal-by-group; default group is the program name.
    pub fn group_or_name(&self) -> &str {
        if self.group.is_empty() {
            &self.name
        } else {
            &self.group
        }
    }

    /// The ordered stop-signal list, defaulting to `[TERM]` when the
    /// declaration left it empty.
    pub fn effective_stop_signals(&self) -> Vec<Signal> {
        if self.stop_signals.is_empty() {
            vec![Signal::Term]
        } else {
            self.stop_signals.clone()
        }
    }

    pub fn expected_exit_codes(&self) -> HashSet<i32> {
        if self.exit_codes.is_empty() {
            HashSet::from([0])
        } else {
            self.exit_codes.clone()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ProcessConfig {
    /// A minimal, valid config for tests: one retry, one-second start/stop
    /// windows, autostart on, restart on unexpected exit.
    pub fn test_default(name: &str, command: &str) -> Self {
        ProcessConfig {
            name: name.to_string(),
            group: String::new(),
            command: command.to_string(),
            directory: None,
            environment: Vec::new(),
            user: None,
            process_num: 0,
            start_retries: 1,
            auto_start: true,
            auto_restart: AutoRestart::Unexpected,
            exit_codes: HashSet::from([0]),
            start_seconds: 1,
            stop_signals: vec![Signal::Term],
            stop_wait_seconds: 1,
            stdout_logfile: None,
            stderr_logfile: None,
            capture_max_bytes: 0,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
