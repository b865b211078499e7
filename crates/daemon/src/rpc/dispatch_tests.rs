use std::io::Write;
use std::sync::Arc;

use supd_core::SystemClock;
use tempfile::NamedTempFile;

use super::*;
use crate::config_view::ConfigView;
use crate::supervisor::Supervisor;

fn supervisor_with(contents: &str) -> (Arc<Supervisor>, NamedTempFile, tempfile::TempDir) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    let view = ConfigView::load(file.path(), "/here", "node-1").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let logs = Arc::new(crate::log_sinks::DirLogSinkFactory::new(dir.path().to_path_buf()));
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
async fn get_version_returns_the_opaque_constant() {
    let (supervisor, _file, _dir) = supervisor_with("");
    let response = dispatch(&supervisor, Request::GetVersion).await;
    match response {
        Response::Ok {
            result: ResponseValue::Version { version },
        } => assert_eq!(version, "3.0"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn get_process_info_errors_not_found_for_unknown_name() {
    let (supervisor, _file, _dir) = supervisor_with("");
    let response = dispatch(
        &supervisor,
        Request::GetProcessInfo {
            name: "nope".to_string(),
        },
    )
    .await;
    assert!(matches!(response, Response::Err { code, .. } if code == "NOT_FOUND"));
}

#[tokio::test]
async fn get_all_process_info_lists_declared_programs() {
    let (supervisor, _file, _dir) = supervisor_with(
        r#"
        [program.a]
        command = "/bin/true"
        "#,
    );
    let response = dispatch(&supervisor, Request::GetAllProcessInfo).await;
    match response {
        Response::Ok {
            result: ResponseValue::ProcessList(list),
        } => assert_eq!(list.len(), 1),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn reload_config_reports_group_diff() {
    let (supervisor, _file, _dir) = supervisor_with(
        r#"
        [program.a]
        command = "/bin/true"
        "#,
    );
    let response = dispatch(&supervisor, Request::ReloadConfig).await;
    match response {
        Response::Ok {
            result: ResponseValue::ReloadResult { added, .. },
        } => assert!(added.is_empty() || added == vec!["a".to_string()]),
        other => panic!("unexpected response: {other:?}"),
    }
}
