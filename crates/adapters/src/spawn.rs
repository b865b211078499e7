//! Raw OS child-process primitives: shell-split + fork/exec into a fresh
//! process group, piped stdio, and group-wide signal delivery.

use std::process::Stdio;

use command_group::{AsyncCommandGroup, AsyncGroupChild};
use nix::sys::signal::{self};
use nix::unistd::Pid;
use supd_core::{ProcessConfig, Signal, SupdError};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};

/// A live OS child, owned exclusively by the Process that spawned it. Runs
/// as the leader of its own process group so `signal_group` reaches every
/// descendant it forks, not just the direct child.
pub struct SpawnedChild {
    group: AsyncGroupChild,
    pgid: Pid,
}

impl SpawnedChild {
    pub fn pid(&self) -> u32 {
        self.group.id()
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.group.inner_mut().stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.group.inner_mut().stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.group.inner_mut().stderr.take()
    }

    pub fn signal_group(&self, signal: Signal) -> Result<(), SupdError> {
        signal::killpg(self.pgid, signal.to_nix())
            .map_err(|e| SupdError::Failed(format!("signal delivery failed: {e}")))
    }

    pub async fn wait(&mut self) -> Result<std::process::ExitStatus, SupdError> {
        self.group
            .wait()
            .await
            .map_err(|e| SupdError::Failed(e.to_string()))
    }

    pub fn try_wait(&mut self) -> Result<Option<std::process::ExitStatus>, SupdError> {
        self.group
            .try_wait()
            .map_err(|e| SupdError::Failed(e.to_string()))
    }
}

/// Shell-splits `config.command`, builds the child's environment from the
/// configured bindings, sets the working directory, and execs into a new
/// process group.
pub fn spawn(config: &ProcessConfig) -> Result<SpawnedChild, SupdError> {
    let tokens = shell_words::split(&config.command)
        .map_err(|e| SupdError::BadArguments(format!("invalid command line: {e}")))?;
    let (program, args) = tokens
        .split_first()
        .ok_or_else(|| SupdError::BadArguments("empty command".into()))?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.envs(config.environment.iter().cloned());
    if let Some(dir) = &config.directory {
        cmd.current_dir(dir);
    }

    let group = cmd.group_spawn().map_err(|e| {
        tracing::warn!(name = %config.name, error = %e, "spawn failed");
        SupdError::SpawnFailed(e.to_string())
    })?;
    let pid = group.id();
    tracing::debug!(name = %config.name, pid, "spawned");

    Ok(SpawnedChild {
        group,
        pgid: Pid::from_raw(pid as i32),
    })
}

/// Resolves a signal directly against a raw pid, used for escalating to
/// KILL against a pid recovered outside of the owning `SpawnedChild` (e.g.
/// during reconciliation after a crash).
pub fn signal_pid(pid: u32, signal: Signal) -> Result<(), SupdError> {
    signal::killpg(Pid::from_raw(pid as i32), signal.to_nix())
        .map_err(|e| SupdError::Failed(format!("signal delivery failed: {e}")))
}

pub fn is_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None::<signal::Signal>).is_ok()
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
