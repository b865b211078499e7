use std::io::Write as _;
use std::sync::Arc;

use supd_core::SystemClock;
use tempfile::NamedTempFile;

use super::*;
use crate::config_view::ConfigView;
use crate::log_sinks::DirLogSinkFactory;

fn supervisor_with(contents: &str) -> (Arc<Supervisor>, NamedTempFile, tempfile::TempDir) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    let view = ConfigView::load(file.path(), "/here", "node-1").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let logs = Arc::new(DirLogSinkFactory::new(dir.path().to_path_buf()));
    let manager = Arc::new(supd_manager::ProcessManager::new(Arc::new(SystemClock), logs));
    for config in view.get_programs() {
        manager.create(config.clone()).unwrap();
    }
    (
        Supervisor::new(
            manager,
            view,
            "/here".to_string(),
            "node-1".to_string(),
            Arc::new(SystemClock),
        ),
        file,
        dir,
    )
}

#[tokio::test]
async fn reload_with_no_changes_reports_empty_diff() {
    let (supervisor, mut file, _dir) = supervisor_with(
        r#"
        [program.a]
        command = "/bin/true"
        "#,
    );
    // The file on disk is unchanged; rewriting identical contents should
    // still yield no added/changed/removed once names and configs match.
    file.as_file_mut().set_len(0).unwrap();
    use std::io::Seek;
    file.as_file_mut().seek(std::io::SeekFrom::Start(0)).unwrap();
    writeln!(file, "[program.a]\ncommand = \"/bin/true\"").unwrap();

    let report = supervisor.reload().await.unwrap();
    assert!(report.added.is_empty());
    assert!(report.changed.is_empty());
    assert!(report.removed.is_empty());
}

#[tokio::test]
async fn reload_detects_added_and_removed_programs() {
    let (supervisor, mut file, _dir) = supervisor_with(
        r#"
        [program.a]
        command = "/bin/true"
        "#,
    );

    file.as_file_mut().set_len(0).unwrap();
    use std::io::Seek;
    file.as_file_mut().seek(std::io::SeekFrom::Start(0)).unwrap();
    writeln!(file, "[program.b]\ncommand = \"/bin/false\"").unwrap();

    let report = supervisor.reload().await.unwrap();
    assert_eq!(report.added, vec!["b".to_string()]);
    assert_eq!(report.removed, vec!["a".to_string()]);
    assert!(supervisor.find("a").is_err());
    assert!(supervisor.find("b").is_ok());
}

#[tokio::test]
async fn reload_detects_changed_program_config() {
    let (supervisor, mut file, _dir) = supervisor_with(
        r#"
        [program.a]
        command = "/bin/true"
        "#,
    );

    file.as_file_mut().set_len(0).unwrap();
    use std::io::Seek;
    file.as_file_mut().seek(std::io::SeekFrom::Start(0)).unwrap();
    writeln!(file, "[program.a]\ncommand = \"/bin/false\"").unwrap();

    let report = supervisor.reload().await.unwrap();
    assert_eq!(report.changed, vec!["a".to_string()]);
    assert_eq!(supervisor.find("a").unwrap().config().command, "/bin/false");
}

#[tokio::test]
async fn write_and_remove_pid_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let pid_path = dir.path().join("nested").join("supd.pid");
    let contents = format!(
        "[supervisord]\npidfile = {:?}\n",
        pid_path.to_string_lossy()
    );
    let (supervisor, _file, _logs) = supervisor_with(&contents);

    supervisor.write_pid_file().unwrap();
    let written = std::fs::read_to_string(&pid_path).unwrap();
    assert_eq!(written, std::process::id().to_string());

    supervisor.remove_pid_file();
    assert!(!pid_path.exists());
}

#[tokio::test]
async fn shutdown_stops_every_process() {
    let (supervisor, _file, _dir) = supervisor_with(
        r#"
        [program.a]
        command = "/bin/sleep 30"
        autostart = false
        "#,
    );
    let process = supervisor.find("a").unwrap();
    process.start(true).await.unwrap();
    assert_eq!(process.state(), supd_core::ProcessState::Running);

    supervisor.shutdown().await;
    assert_eq!(process.state(), supd_core::ProcessState::Stopped);
}

#[tokio::test]
async fn process_info_reflects_current_snapshot() {
    let (supervisor, _file, _dir) = supervisor_with(
        r#"
        [program.a]
        command = "/bin/true"
        "#,
    );
    let process = supervisor.find("a").unwrap();
    let info = supervisor.process_info(&process);
    assert_eq!(info.name, "a");
    assert_eq!(info.command, "/bin/true");
    assert_eq!(info.statename, "STOPPED");
}

#[tokio::test]
async fn request_shutdown_wakes_the_waiter() {
    let (supervisor, _file, _dir) = supervisor_with("");
    let waiter = Arc::clone(&supervisor);
    let handle = tokio::spawn(async move {
        waiter.wait_for_shutdown_request().await;
    });
    supervisor.request_shutdown();
    tokio::time::timeout(std::time::Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}
