//! The process registry: name -> `Process`, plus the matching and fan-out
//! primitives the RPC surface and the reload protocol are built from.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use supd_core::{Clock, ProcessConfig, SupdError, SupdResult};
use supd_log::RotatingLog;
use tokio::sync::mpsc;

use crate::process::Process;

/// Where a managed process's stdout/stderr sinks live on disk, decoupled
/// from `ProcessConfig` so callers can point it at a scratch directory in
/// tests.
pub trait LogSinkFactory: Send + Sync {
    fn stdout_log(&self, config: &ProcessConfig) -> std::io::Result<RotatingLog>;
    fn stderr_log(&self, config: &ProcessConfig) -> std::io::Result<RotatingLog>;
}

pub struct ProcessManager {
    processes: RwLock<HashMap<String, Arc<Process>>>,
    clock: Arc<dyn Clock>,
    logs: Arc<dyn LogSinkFactory>,
}

/// The outcome of diffing a freshly loaded configuration set against the
/// registry: which names are brand new, which changed (and so must be
/// restarted), and which disappeared entirely.
#[derive(Debug, Default)]
pub struct ReloadDiff {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

impl ProcessManager {
    pub fn new(clock: Arc<dyn Clock>, logs: Arc<dyn LogSinkFactory>) -> Self {
        Self {
            processes: RwLock::new(HashMap::new()),
            clock,
            logs,
        }
    }

    /// Registers a new process from `config`. Idempotent: returns the
    /// existing instance if one is already registered under this name.
    pub fn create(&self, config: ProcessConfig) -> SupdResult<Arc<Process>> {
        if let Some(existing) = self.processes.read().get(&config.name) {
            return Ok(Arc::clone(existing));
        }
        let stdout = self.logs.stdout_log(&config).map_err(SupdError::from)?;
        let stderr = self.logs.stderr_log(&config).map_err(SupdError::from)?;
        let process = Process::new(config.clone(), Arc::new(stdout), Arc::new(stderr), Arc::clone(&self.clock));
        self.processes.write().insert(config.name.clone(), Arc::clone(&process));
        Ok(process)
    }

    pub fn find(&self, name: &str) -> Option<Arc<Process>> {
        self.processes.read().get(name).cloned()
    }

    /// Resolves a name pattern: a bare name, `group:*` for every process in
    /// a group, or `all` for the entire registry.
    pub fn find_match(&self, pattern: &str) -> Vec<Arc<Process>> {
        if pattern == "all" {
            return self.processes.read().values().cloned().collect();
        }
        if let Some(group) = pattern.strip_suffix(":*") {
            return self
                .processes
                .read()
                .values()
                .filter(|p| p.group() == group)
                .cloned()
                .collect();
        }
        self.find(pattern).into_iter().collect()
    }

    /// Detaches `name` from the registry without touching its runtime
    /// state; the caller (the reload protocol) is responsible for stopping
    /// it first if that is what's wanted.
    pub fn remove(&self, name: &str) -> Option<Arc<Process>> {
        self.processes.write().remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.processes.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.processes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.read().is_empty()
    }

    /// Runs `f` against a point-in-time snapshot of every registered
    /// process, serially.
    pub fn for_each(&self, mut f: impl FnMut(&Arc<Process>)) {
        let snapshot: Vec<_> = self.processes.read().values().cloned().collect();
        for process in &snapshot {
            f(process);
        }
    }

    /// Schedules `f` concurrently against every registered process.
    /// Returns immediately with the count scheduled and a receiver that
    /// yields each process as its task completes — exactly that many
    /// sends, then the channel closes. The channel has a capacity of 1 —
    /// tokio's `mpsc` disallows true zero capacity, so this is the closest
    /// approximation to an unbuffered, backpressuring handoff: a slow
    /// receiver stalls the completing tasks rather than letting them all
    /// buffer up.
    pub fn async_for_each<F, Fut>(&self, f: F) -> (usize, mpsc::Receiver<Arc<Process>>)
    where
        F: Fn(Arc<Process>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let snapshot: Vec<_> = self.processes.read().values().cloned().collect();
        let count = snapshot.len();
        let (tx, rx) = mpsc::channel(1);
        let f = Arc::new(f);
        for process in snapshot {
            let tx = tx.clone();
            let f = Arc::clone(&f);
            tokio::spawn(async move {
                let done = Arc::clone(&process);
                f(process).await;
                let _ = tx.send(done).await;
            });
        }
        (count, rx)
    }

    /// Diffs `new_configs` against the currently registered names. Neither
    /// mutates the registry nor the config held by existing processes —
    /// the reload protocol applies `Create`/`Remove`/`update_config` and
    /// the matching `Start`/`Stop` calls using this result.
    pub fn diff(&self, new_configs: &[ProcessConfig]) -> ReloadDiff {
        let previous = self.processes.read();
        let mut diff = ReloadDiff::default();
        for config in new_configs {
            match previous.get(&config.name) {
                None => diff.added.push(config.name.clone()),
                Some(existing) => {
                    if existing.config() != *config {
                        diff.changed.push(config.name.clone());
                    }
                }
            }
        }
        let new_names: std::collections::HashSet<&str> =
            new_configs.iter().map(|c| c.name.as_str()).collect();
        for name in previous.keys() {
            if !new_names.contains(name.as_str()) {
                diff.removed.push(name.clone());
            }
        }
        diff
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
