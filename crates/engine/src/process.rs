//! The Process state machine: spawn, observe, restart, signal, stop.
//!
//! One background task drives a process through an attempt sequence (spawn
//! -> readiness timer -> RUNNING -> exit -> respawn/backoff) for as long as
//! it stays non-idle; `Start`/`Stop` are thin, serialized entry points that
//! hand off to that task and then optionally wait on a transition
//! notification, mirroring the condition-variable wording of the
//! concurrency model this implements.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use supd_adapters::{spawn as os_spawn, SpawnedChild};
use supd_core::{Clock, ProcessConfig, ProcessState, Signal, SupdError, SupdResult};
use supd_log::RotatingLog;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Notify;
use tokio::time::timeout;

/// Fields mutated only while holding `Process::core`, and only ever for the
/// short critical section of a single transition.
#[derive(Debug, Clone, Default)]
pub struct ProcessCore {
    pub state: ProcessState,
    pub pid: u32,
    pub start_attempts: u32,
    pub start_time: u64,
    pub stop_time: u64,
    pub last_exit_status: Option<i32>,
    pub spawn_error: Option<String>,
}

impl ProcessCore {
    fn new() -> Self {
        Self {
            state: ProcessState::Stopped,
            ..Default::default()
        }
    }
}

/// A read-only point-in-time view, for `ProcessInfo` and test assertions.
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub name: String,
    pub group: String,
    pub config: ProcessConfig,
    pub core: ProcessCore,
}

pub struct Process {
    name: String,
    config: RwLock<ProcessConfig>,
    core: Mutex<ProcessCore>,
    notify: Notify,
    child: tokio::sync::Mutex<Option<SpawnedChild>>,
    stdin: tokio::sync::Mutex<Option<tokio::process::ChildStdin>>,
    /// Bumped on every `Stop`, so a sleeping backoff timer from a previous
    /// attempt sequence knows to give up instead of respawning underneath
    /// a Stop that already moved the process to STOPPING/STOPPED.
    generation: AtomicU64,
    stdout_log: Arc<RotatingLog>,
    stderr_log: Arc<RotatingLog>,
    clock: Arc<dyn Clock>,
    /// Serializes Start/Stop so only one drives a transition at a time.
    op_lock: tokio::sync::Mutex<()>,
}

impl Process {
    pub fn new(
        config: ProcessConfig,
        stdout_log: Arc<RotatingLog>,
        stderr_log: Arc<RotatingLog>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let name = config.name.clone();
        Arc::new(Self {
            name,
            config: RwLock::new(config),
            core: Mutex::new(ProcessCore::new()),
            notify: Notify::new(),
            child: tokio::sync::Mutex::new(None),
            stdin: tokio::sync::Mutex::new(None),
            generation: AtomicU64::new(0),
            stdout_log,
            stderr_log,
            clock,
            op_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> String {
        self.config.read().group_or_name().to_string()
    }

    pub fn config(&self) -> ProcessConfig {
        self.config.read().clone()
    }

    /// Replaces the configuration snapshot without touching runtime state;
    /// the reload protocol decides separately whether to Stop/Start.
    pub fn update_config(&self, config: ProcessConfig) {
        *self.config.write() = config;
    }

    pub fn state(&self) -> ProcessState {
        self.core.lock().state
    }

    pub fn snapshot(&self) -> ProcessSnapshot {
        ProcessSnapshot {
            name: self.name.clone(),
            group: self.group(),
            config: self.config(),
            core: self.core.lock().clone(),
        }
    }

    fn set_state(&self, state: ProcessState) {
        self.core.lock().state = state;
        self.notify.notify_waiters();
    }

    async fn wait_until(&self, pred: impl Fn(ProcessState) -> bool) {
        loop {
            if pred(self.state()) {
                return;
            }
            let notified = self.notify.notified();
            if pred(self.state()) {
                return;
            }
            notified.await;
        }
    }

    /// `Start(wait)`. Idempotent when already STARTING/RUNNING.
    pub async fn start(self: &Arc<Self>, wait: bool) -> SupdResult<()> {
        let _guard = self.op_lock.lock().await;
        let state = self.state();
        if matches!(state, ProcessState::Starting | ProcessState::Running) {
            return Ok(());
        }
        if !state.is_startable() {
            return Err(SupdError::AlreadyStarted);
        }
        self.core.lock().start_attempts = 0;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_state(ProcessState::Starting);
        tokio::spawn(supervise(Arc::clone(self), generation));
        drop(_guard);
        if wait {
            self.wait_until(|s| !matches!(s, ProcessState::Starting)).await;
        }
        Ok(())
    }

    /// `Stop(wait)`. Walks the configured stop-signal sequence, escalating
    /// to KILL, with `stop_wait_seconds` between each.
    pub async fn stop(self: &Arc<Self>, wait: bool) -> SupdResult<()> {
        let _guard = self.op_lock.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        let state = self.state();

        if matches!(state, ProcessState::Backoff) {
            self.set_state(ProcessState::Stopped);
            return Ok(());
        }
        if !state.has_child() {
            return Ok(());
        }

        self.set_state(ProcessState::Stopping);
        let config = self.config();
        let signals = config.effective_stop_signals();
        let stop_wait = Duration::from_secs(config.stop_wait_seconds);

        for sig in signals {
            self.send_signal(sig).ok();
            if self.child_has_exited().await {
                break;
            }
            let _ = timeout(stop_wait, self.wait_for_child_exit()).await;
            if self.child_has_exited().await {
                break;
            }
        }
        if !self.child_has_exited().await {
            self.send_signal(Signal::Kill).ok();
            let _ = self.wait_for_child_exit().await;
        }
        self.finish_stop().await;
        drop(_guard);

        if wait {
            self.wait_until(|s| {
                matches!(s, ProcessState::Stopped | ProcessState::Exited | ProcessState::Fatal)
            })
            .await;
        }
        Ok(())
    }

    async fn child_has_exited(&self) -> bool {
        let mut guard = self.child.lock().await;
        match guard.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(Some(_))),
            None => true,
        }
    }

    async fn wait_for_child_exit(&self) {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            let _ = child.wait().await;
        }
    }

    async fn finish_stop(&self) {
        let mut guard = self.child.lock().await;
        let status = if let Some(mut child) = guard.take() {
            child.wait().await.ok()
        } else {
            None
        };
        *self.stdin.lock().await = None;
        let mut core = self.core.lock();
        core.last_exit_status = status.and_then(exit_code);
        core.pid = 0;
        core.stop_time = self.clock.unix_seconds();
        core.state = ProcessState::Stopped;
        drop(core);
        self.notify.notify_waiters();
    }

    /// Forwards `signal` to the OS child if one is alive; a no-op
    /// otherwise (never changes state).
    pub fn signal(&self, signal: Signal) -> SupdResult<()> {
        self.send_signal(signal)
    }

    fn send_signal(&self, signal: Signal) -> SupdResult<()> {
        let guard = self.child.try_lock();
        match guard {
            Ok(guard) => match guard.as_ref() {
                Some(child) => child.signal_group(signal),
                None => Err(SupdError::NotRunning),
            },
            Err(_) => Err(SupdError::Failed("process busy".into())),
        }
    }

    /// Writes `chars` to the child's stdin. Requires RUNNING.
    pub async fn send_stdin(&self, chars: &str) -> SupdResult<()> {
        if self.state() != ProcessState::Running {
            return Err(SupdError::NotRunning);
        }
        let mut guard = self.stdin.lock().await;
        match guard.as_mut() {
            Some(stdin) => {
                stdin
                    .write_all(chars.as_bytes())
                    .await
                    .map_err(SupdError::from)?;
                Ok(())
            }
            None => Err(SupdError::NotRunning),
        }
    }
}

fn exit_code(status: std::process::ExitStatus) -> Option<i32> {
    status.code()
}

/// Drives one attempt sequence: spawn, arm the readiness timer, run to
/// exit, then either respawn (autorestart) or go idle. Gives up early if
/// `generation` no longer matches (a `Stop` ran underneath it).
async fn supervise(process: Arc<Process>, generation: u64) {
    loop {
        if process.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        let config = process.config();

        let mut child = match os_spawn(&config) {
            Ok(child) => child,
            Err(e) => {
                process.core.lock().spawn_error = Some(e.to_string());
                if !record_failed_attempt(&process, &config, generation).await {
                    return;
                }
                continue;
            }
        };

        let pid = child.pid();
        {
            let mut core = process.core.lock();
            core.pid = pid;
            core.start_time = process.clock.unix_seconds();
            core.spawn_error = None;
        }

        pipe_to_log(child.take_stdout(), Arc::clone(&process_stdout(&process)));
        pipe_to_log(child.take_stderr(), Arc::clone(&process_stderr(&process)));
        *process.stdin.lock().await = child.take_stdin();

        *process.child.lock().await = Some(child);

        let start_seconds = Duration::from_secs(config.start_seconds);
        let became_ready = tokio::select! {
            _ = tokio::time::sleep(start_seconds) => {
                !process.child_has_exited().await
            }
            _ = wait_for_exit(&process) => false,
        };

        if process.generation.load(Ordering::SeqCst) != generation {
            return;
        }

        if became_ready {
            process.core.lock().start_attempts = 0;
            process.set_state(ProcessState::Running);

            wait_for_exit(&process).await;
            if process.generation.load(Ordering::SeqCst) != generation {
                return;
            }

            let status = { process.core.lock().last_exit_status };
            let expected = config.expected_exit_codes();
            let code_expected = status.map(|c| expected.contains(&c)).unwrap_or(false);
            let should_restart = match config.auto_restart {
                supd_core::AutoRestart::Always => true,
                supd_core::AutoRestart::Never => false,
                supd_core::AutoRestart::Unexpected => !code_expected,
            };
            process.set_state(ProcessState::Exited);
            if !should_restart {
                return;
            }
            process.set_state(ProcessState::Starting);
            continue;
        }

        // The child died before the readiness timer fired: a failed
        // start attempt.
        if !record_failed_attempt(&process, &config, generation).await {
            return;
        }
    }
}

fn process_stdout(process: &Arc<Process>) -> Arc<RotatingLog> {
    Arc::clone(&process.stdout_log)
}

fn process_stderr(process: &Arc<Process>) -> Arc<RotatingLog> {
    Arc::clone(&process.stderr_log)
}

async fn wait_for_exit(process: &Arc<Process>) {
    let status = {
        let mut guard = process.child.lock().await;
        match guard.as_mut() {
            Some(child) => child.wait().await.ok(),
            None => return,
        }
    };
    process.core.lock().last_exit_status = status.and_then(exit_code);
}

/// Increments the attempt counter and decides BACKOFF vs FATAL. Returns
/// `true` if the same attempt sequence should respawn after sleeping out
/// the backoff delay, `false` if the process has gone FATAL, or a `Stop`
/// reclaimed this generation while it slept.
async fn record_failed_attempt(
    process: &Arc<Process>,
    config: &ProcessConfig,
    generation: u64,
) -> bool {
    let attempts = {
        let mut core = process.core.lock();
        core.start_attempts += 1;
        core.start_attempts
    };
    process.set_state(ProcessState::Backoff);
    if attempts > config.start_retries {
        process.set_state(ProcessState::Fatal);
        return false;
    }
    let delay = Duration::from_secs(attempts.min(config.start_retries) as u64);
    tokio::time::sleep(delay).await;
    if process.generation.load(Ordering::SeqCst) != generation {
        return false;
    }
    process.set_state(ProcessState::Starting);
    true
}

fn pipe_to_log(
    reader: Option<impl tokio::io::AsyncRead + Unpin + Send + 'static>,
    sink: Arc<RotatingLog>,
) {
    let Some(mut reader) = reader else { return };
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let _ = sink.write(&buf[..n]);
                }
            }
        }
    });
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
