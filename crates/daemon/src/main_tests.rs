use super::*;

#[test]
fn find_default_config_falls_back_to_the_second_candidate_when_nothing_exists() {
    // None of the hard-coded candidates exist relative to the test binary's
    // cwd (and we don't chdir in tests), so the fallback path is exercised.
    let path = find_default_config();
    assert_eq!(path, PathBuf::from("/etc/supd/supd.conf"));
}

#[test]
fn default_log_dir_uses_the_logfile_parent_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("supd.conf");
    let log_path = dir.path().join("logs/supd.log");
    std::fs::write(
        &config_path,
        format!("[supervisord]\nlogfile = {:?}\n", log_path.to_string_lossy()),
    )
    .unwrap();

    let view = ConfigView::load(&config_path, "/here", "node-1").unwrap();
    assert_eq!(default_log_dir(&view), dir.path().join("logs"));
}

#[test]
fn default_log_dir_falls_back_when_unconfigured() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("supd.conf");
    std::fs::write(&config_path, "[supervisord]\n").unwrap();

    let view = ConfigView::load(&config_path, "/here", "node-1").unwrap();
    assert_eq!(default_log_dir(&view), PathBuf::from("/var/log/supd"));
}

#[test]
fn hostname_never_returns_an_empty_string() {
    assert!(!hostname().is_empty());
}
