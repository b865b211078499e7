// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! supd: a process supervisor in the style of the `supervisord` family.
//!
//! Owns a configured set of child processes: spawning, restart-with-backoff,
//! graceful stop, and a remote control surface over a Unix socket and/or
//! TCP.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use supd_core::SystemClock;
use supd_daemon::{ConfigView, DirLogSinkFactory, Supervisor};
use supd_manager::ProcessManager;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("supd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                println!("supd {}", env!("CARGO_PKG_VERSION"));
                println!("A process supervisor. Reads its configuration and runs in the foreground.");
                println!();
                println!("USAGE:");
                println!("    supd [-c CONFIG]");
                return Ok(());
            }
            _ => {}
        }
    }

    let config_path = config_path_from_args();
    let _log_guard = setup_logging();

    let here = config_path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());
    let host_node_name = hostname();

    info!(config = %config_path.display(), "starting supd");

    let view = ConfigView::load(&config_path, &here, &host_node_name)?;
    let log_dir = default_log_dir(&view);
    let logs = Arc::new(DirLogSinkFactory::new(log_dir));
    let manager = Arc::new(ProcessManager::new(Arc::new(SystemClock), logs));

    for config in view.get_event_listeners() {
        manager.create(config.clone())?;
    }
    for config in view.get_programs() {
        let process = manager.create(config.clone())?;
        if config.auto_start {
            process.start(false).await?;
        }
    }

    let supervisor = Supervisor::new(
        manager,
        view.clone(),
        here,
        host_node_name,
        Arc::new(SystemClock),
    );
    supervisor.write_pid_file()?;
    supervisor.rebind_listeners(&view).await?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("supd ready");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
        _ = supervisor.wait_for_shutdown_request() => info!("shutdown requested via RPC"),
    }

    supervisor.shutdown().await;
    info!("supd stopped");
    Ok(())
}

fn config_path_from_args() -> PathBuf {
    let args: Vec<String> = std::env::args().collect();
    for pair in args.windows(2) {
        if pair[0] == "-c" || pair[0] == "--configuration" {
            return PathBuf::from(&pair[1]);
        }
    }
    find_default_config()
}

/// Mirrors the lookup order a configured `-c` flag skips: cwd, then the
/// usual system locations, falling back to the last candidate so the
/// eventual "no such file" error names a real path.
fn find_default_config() -> PathBuf {
    let candidates = [
        "./supd.conf",
        "/etc/supd/supd.conf",
        "/etc/supd/supd.ini",
        "../etc/supd/supd.conf",
    ];
    for candidate in candidates {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return path;
        }
    }
    PathBuf::from(candidates[1])
}

fn default_log_dir(view: &ConfigView) -> PathBuf {
    view.get_supervisord()
        .logfile
        .as_ref()
        .and_then(|p| PathBuf::from(p).parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("/var/log/supd"))
}

fn hostname() -> String {
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    guard
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
