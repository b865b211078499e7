//! The orchestrator: reload diffing, pid file, and shutdown sequencing.
//! RPC handlers call through this rather than touching the `ProcessManager`
//! or `ConfigView` directly.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use supd_core::{Clock, Signal, SupdError, SupdResult};
use supd_manager::{Process, ProcessManager};
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::config_view::ConfigView;
use crate::rpc::ProcessInfo;

/// A group-diff or program-diff triple: lists of names added, changed, and
/// removed between two loaded configurations.
#[derive(Debug, Default, Clone)]
pub struct ReloadReport {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

pub struct Supervisor {
    manager: Arc<ProcessManager>,
    view: RwLock<ConfigView>,
    here: String,
    host_node_name: String,
    clock: Arc<dyn Clock>,
    start_time: u64,
    reload_lock: tokio::sync::Mutex<()>,
    pid_file: RwLock<Option<PathBuf>>,
    pid_lock: Mutex<Option<File>>,
    supervisor_log: Mutex<Option<supd_log::RotatingLog>>,
    listener_handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    shutdown_notify: Notify,
    self_weak: Weak<Supervisor>,
}

impl Supervisor {
    /// Returns an `Arc` rather than a bare value: the reload protocol needs
    /// to hand a strong reference to itself to `rpc::serve` when rebinding
    /// listeners, so the instance keeps a `Weak` back-pointer wired up by
    /// `Arc::new_cyclic`.
    pub fn new(
        manager: Arc<ProcessManager>,
        view: ConfigView,
        here: String,
        host_node_name: String,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let pid_file = view
            .get_supervisord()
            .pidfile
            .as_ref()
            .map(PathBuf::from);
        let supervisor_log = view
            .get_supervisord()
            .logfile
            .as_ref()
            .and_then(|path| supd_log::RotatingLog::open(path, 50 * 1024 * 1024, 10).ok());
        Arc::new_cyclic(|weak| Self {
            manager,
            view: RwLock::new(view),
            here,
            host_node_name,
            start_time: clock.unix_seconds(),
            clock,
            reload_lock: tokio::sync::Mutex::new(()),
            pid_file: RwLock::new(pid_file),
            pid_lock: Mutex::new(None),
            supervisor_log: Mutex::new(supervisor_log),
            listener_handles: Mutex::new(Vec::new()),
            shutdown_notify: Notify::new(),
            self_weak: weak.clone(),
        })
    }

    /// Wakes `main`'s event loop so it can stop all processes and exit.
    /// The RPC reply to `Shutdown` returns immediately; this happens after.
    pub fn request_shutdown(&self) {
        self.shutdown_notify.notify_one();
    }

    pub async fn wait_for_shutdown_request(&self) {
        self.shutdown_notify.notified().await;
    }

    pub fn manager(&self) -> &Arc<ProcessManager> {
        &self.manager
    }

    pub fn config_path(&self) -> PathBuf {
        self.view.read().path().to_path_buf()
    }

    /// Writes the decimal pid, no trailing newline, creating parent dirs.
    /// Holds an exclusive flock on the file for the supervisor's lifetime so
    /// a second instance pointed at the same pidfile fails fast instead of
    /// racing this one.
    pub fn write_pid_file(&self) -> SupdResult<()> {
        let path = self.pid_file.read().clone();
        let Some(path) = path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SupdError::from)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(SupdError::from)?;
        file.try_lock_exclusive().map_err(|_| {
            SupdError::Failed(format!("{} is already locked by another supd instance", path.display()))
        })?;
        std::io::Write::write_all(&mut &file, std::process::id().to_string().as_bytes())
            .map_err(SupdError::from)?;
        *self.pid_lock.lock() = Some(file);
        Ok(())
    }

    pub fn remove_pid_file(&self) {
        self.pid_lock.lock().take();
        if let Some(path) = self.pid_file.read().as_ref() {
            let _ = std::fs::remove_file(path);
        }
    }

    /// Re-points the pid file at `new_path` if it changed since the last
    /// load, releasing the old lock/file first. A no-op when the path is
    /// unchanged, since the pid itself can't change across a reload.
    fn refresh_pid_file(&self, new_path: Option<PathBuf>) -> SupdResult<()> {
        if *self.pid_file.read() == new_path {
            return Ok(());
        }
        self.remove_pid_file();
        *self.pid_file.write() = new_path;
        self.write_pid_file()
    }

    /// Drops the supervisor's own log entirely and reopens it at `logfile`
    /// if the path changed, otherwise forces a rotation in place — the
    /// reload-time equivalent of a `logrotate` reopen signal.
    fn refresh_supervisor_log(&self, logfile: Option<&str>) {
        let mut current = self.supervisor_log.lock();
        let matches_path = match (&*current, logfile) {
            (Some(log), Some(path)) => log.path() == std::path::Path::new(path),
            (None, None) => true,
            _ => false,
        };
        if matches_path {
            if let Some(log) = current.as_ref() {
                if let Err(e) = log.rotate_now() {
                    warn!(error = %e, "reload: failed to rotate supervisor log");
                }
            }
            return;
        }
        *current = logfile.and_then(|path| supd_log::RotatingLog::open(path, 50 * 1024 * 1024, 10).ok());
    }

    /// Aborts the currently bound RPC listeners (none, at startup) and binds
    /// against `view`, so a changed `[unix_http_server]`/`[inet_http_server]`
    /// section takes effect on reload rather than only at process start.
    pub async fn rebind_listeners(&self, view: &ConfigView) -> SupdResult<()> {
        let Some(supervisor) = self.self_weak.upgrade() else {
            return Ok(());
        };
        let new_handles = crate::rpc::serve(supervisor, view).await.map_err(SupdError::from)?;
        let mut handles = self.listener_handles.lock();
        for handle in handles.drain(..) {
            handle.abort();
        }
        *handles = new_handles;
        Ok(())
    }

    /// The nine-step reload protocol. Single-writer: only one reload runs
    /// at a time, enforced by `reload_lock`.
    pub async fn reload(&self) -> SupdResult<ReloadReport> {
        let _guard = self.reload_lock.lock().await;

        let path = self.view.read().path().to_path_buf();
        let new_view = match ConfigView::load(&path, &self.here, &self.host_node_name) {
            Ok(view) => view,
            Err(e) => {
                warn!(error = %e, "reload: config parse failed, keeping running set");
                return Err(e);
            }
        };

        // Step 3: supervisord-level side effects ahead of the process diff.
        self.refresh_supervisor_log(new_view.get_supervisord().logfile.as_deref());
        self.refresh_pid_file(new_view.get_supervisord().pidfile.as_ref().map(PathBuf::from))?;
        self.rebind_listeners(&new_view).await?;

        let previous_groups = self.view.read().get_groups();
        let new_configs = new_view.all_processes();
        let diff = self.manager.diff(&new_configs);

        // Removed: drop from registry, Stop(wait=false).
        for name in &diff.removed {
            if let Some(process) = self.manager.remove(name) {
                let _ = process.stop(false).await;
            }
        }

        // Create entries for every new declaration; existing names keep
        // their runtime state untouched by `create`.
        let mut by_name = HashMap::new();
        for config in &new_configs {
            by_name.insert(config.name.clone(), config.clone());
        }

        for name in &diff.added {
            if let Some(config) = by_name.get(name) {
                let process = self.manager.create(config.clone())?;
                if config.auto_start {
                    process.start(false).await?;
                }
            }
        }

        for name in &diff.changed {
            if let Some(config) = by_name.get(name) {
                if let Some(process) = self.manager.find(name) {
                    process.update_config(config.clone());
                    if !config.auto_start && process.state() == supd_core::ProcessState::Stopped {
                        continue;
                    }
                    if process.state().has_child() {
                        process.stop(true).await?;
                        process.start(false).await?;
                    } else if config.auto_start {
                        process.start(false).await?;
                    }
                }
            }
        }

        let new_groups = new_view.get_groups();
        *self.view.write() = new_view;

        let report = group_diff(&previous_groups, &new_groups);
        info!(
            added = report.added.len(),
            changed = report.changed.len(),
            removed = report.removed.len(),
            "reload complete"
        );
        Ok(report)
    }

    pub fn find(&self, name: &str) -> SupdResult<Arc<Process>> {
        self.manager
            .find(name)
            .ok_or_else(|| SupdError::NotFound(name.to_string()))
    }

    pub async fn start_process(&self, name: &str, wait: bool) -> SupdResult<()> {
        self.find(name)?.start(wait).await
    }

    pub async fn stop_process(&self, name: &str, wait: bool) -> SupdResult<()> {
        self.find(name)?.stop(wait).await
    }

    pub async fn restart_process(&self, name: &str, wait: bool) -> SupdResult<()> {
        let process = self.find(name)?;
        process.stop(true).await?;
        process.start(wait).await
    }

    pub async fn start_group(&self, pattern: &str, wait: bool) -> Vec<Arc<Process>> {
        let processes = self.manager.find_match(pattern);
        for process in &processes {
            let _ = process.start(wait).await;
        }
        processes
    }

    pub async fn stop_group(&self, pattern: &str, wait: bool) -> Vec<Arc<Process>> {
        let processes = self.manager.find_match(pattern);
        for process in &processes {
            let _ = process.stop(wait).await;
        }
        processes
    }

    pub async fn start_all(&self, wait: bool) -> Vec<Arc<Process>> {
        self.start_group("all", wait).await
    }

    pub async fn stop_all(&self, wait: bool) -> Vec<Arc<Process>> {
        self.stop_group("all", wait).await
    }

    pub async fn restart_all(&self, wait: bool) -> Vec<Arc<Process>> {
        self.stop_all(true).await;
        self.start_all(wait).await
    }

    pub fn signal_process(&self, name: &str, signal: Signal) -> SupdResult<()> {
        self.find(name)?.signal(signal)
    }

    pub fn signal_all(&self, signal: Signal) -> Vec<Arc<Process>> {
        let processes = self.manager.find_match("all");
        for process in &processes {
            let _ = process.signal(signal);
        }
        processes
    }

    pub async fn send_stdin(&self, name: &str, chars: &str) -> SupdResult<()> {
        self.find(name)?.send_stdin(chars).await
    }

    /// Stops every process then returns; the caller (`main`) exits the
    /// process after awaiting this.
    pub async fn shutdown(&self) {
        info!("shutdown: stopping all processes");
        let (count, mut rx) = self.manager.async_for_each(|p: Arc<Process>| async move {
            let _ = p.stop(true).await;
        });
        for _ in 0..count {
            if rx.recv().await.is_none() {
                break;
            }
        }
        for handle in self.listener_handles.lock().drain(..) {
            handle.abort();
        }
        self.remove_pid_file();
    }

    pub fn process_info(&self, process: &Process) -> ProcessInfo {
        let snapshot = process.snapshot();
        let config = &snapshot.config;
        ProcessInfo {
            name: snapshot.name.clone(),
            group: snapshot.group.clone(),
            description: format!("pid {}", snapshot.core.pid),
            start: snapshot.core.start_time,
            stop: snapshot.core.stop_time,
            now: self.clock.unix_seconds(),
            state: snapshot.core.state.code(),
            statename: snapshot.core.state.as_str().to_string(),
            spawnerr: snapshot.core.spawn_error.clone().unwrap_or_default(),
            exitstatus: snapshot.core.last_exit_status.unwrap_or(0),
            logfile: config.stdout_logfile.clone().unwrap_or_default(),
            stdout_logfile: config.stdout_logfile.clone().unwrap_or_default(),
            stderr_logfile: config.stderr_logfile.clone().unwrap_or_default(),
            pid: snapshot.core.pid,
            directory: config.directory.clone().unwrap_or_default(),
            command: config.command.clone(),
            ini_path: self.config_path().display().to_string(),
        }
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }
}

/// Set comparison of `group -> sorted members` between two loaded
/// configurations, independent of the program-name diff used to drive the
/// stop/start side effects above.
fn group_diff(previous: &HashMap<String, Vec<String>>, current: &HashMap<String, Vec<String>>) -> ReloadReport {
    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut removed = Vec::new();

    for (group, members) in current {
        match previous.get(group) {
            None => added.push(group.clone()),
            Some(prev_members) if prev_members != members => changed.push(group.clone()),
            Some(_) => {}
        }
    }
    for group in previous.keys() {
        if !current.contains_key(group) {
            removed.push(group.clone());
        }
    }

    added.sort();
    changed.sort();
    removed.sort();
    ReloadReport { added, changed, removed }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
