//! Shared harness for the end-to-end specs: a `Supervisor` built from an
//! inline TOML snippet, wired to real `ProcessManager`/`RotatingLog`
//! collaborators under a scratch directory.

use std::io::Write;
use std::sync::Arc;

use supd_core::SystemClock;
use supd_daemon::{ConfigView, DirLogSinkFactory, Supervisor};
use supd_manager::ProcessManager;
use tempfile::{NamedTempFile, TempDir};

/// Holds the temp config file and scratch log directory alive for the
/// caller's scope; dropping either would pull the rug from under the
/// running processes mid-test.
pub struct Harness {
    pub supervisor: Arc<Supervisor>,
    _config_file: NamedTempFile,
    _log_dir: TempDir,
}

impl Harness {
    pub fn build(toml: &str) -> Self {
        let mut config_file = NamedTempFile::new().expect("create temp config");
        config_file
            .write_all(toml.as_bytes())
            .expect("write temp config");
        let view = ConfigView::load(config_file.path(), "/here", "spec-node")
            .expect("parse config");

        let log_dir = tempfile::tempdir().expect("create temp log dir");
        let logs = Arc::new(DirLogSinkFactory::new(log_dir.path().to_path_buf()));
        let manager = Arc::new(ProcessManager::new(Arc::new(SystemClock), logs));
        for config in view.get_programs() {
            manager.create(config.clone()).expect("create process");
        }

        let supervisor = Supervisor::new(
            manager,
            view,
            "/here".to_string(),
            "spec-node".to_string(),
            Arc::new(SystemClock),
        );

        Self {
            supervisor,
            _config_file: config_file,
            _log_dir: log_dir,
        }
    }
}

/// Polls `check` every 50ms up to `timeout`, returning true the first time
/// it passes. Yields via `tokio::time::sleep` rather than blocking the
/// worker thread, so the process's own supervise task keeps making
/// progress while this loop waits.
pub async fn wait_for(timeout: std::time::Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}
