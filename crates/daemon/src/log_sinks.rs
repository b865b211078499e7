//! Resolves each process's configured `stdout_logfile`/`stderr_logfile`
//! into a `RotatingLog`, falling back to a per-process file under a
//! scratch directory when the declaration leaves it unset.

use std::path::PathBuf;

use supd_core::ProcessConfig;
use supd_log::RotatingLog;
use supd_manager::LogSinkFactory;

const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;
const DEFAULT_BACKUPS: u32 = 10;

pub struct DirLogSinkFactory {
    dir: PathBuf,
}

impl DirLogSinkFactory {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn resolve(&self, config: &ProcessConfig, declared: &Option<String>, suffix: &str) -> PathBuf {
        match declared {
            Some(path) => PathBuf::from(path),
            None => self.dir.join(format!("{}-{}.log", config.name, suffix)),
        }
    }
}

impl LogSinkFactory for DirLogSinkFactory {
    fn stdout_log(&self, config: &ProcessConfig) -> std::io::Result<RotatingLog> {
        RotatingLog::open(
            self.resolve(config, &config.stdout_logfile, "stdout"),
            DEFAULT_MAX_BYTES,
            DEFAULT_BACKUPS,
        )
    }

    fn stderr_log(&self, config: &ProcessConfig) -> std::io::Result<RotatingLog> {
        RotatingLog::open(
            self.resolve(config, &config.stderr_logfile, "stderr"),
            DEFAULT_MAX_BYTES,
            DEFAULT_BACKUPS,
        )
    }
}
