//! Reload-diff scenario: previous set `{a,b,c}` (all running), new set
//! `{b,c,d}` with `c`'s command changed. `a` stops, `d` starts, `c`
//! restarts, `b` is untouched.

use std::io::Write;

use supd_core::ProcessState;

use crate::prelude::Harness;

const INITIAL: &str = r#"
[program.a]
command = "/bin/sleep 30"
startsecs = 0

[program.b]
command = "/bin/sleep 30"
startsecs = 0

[program.c]
command = "/bin/sleep 30"
startsecs = 0
"#;

#[tokio::test]
async fn reload_starts_stops_and_restarts_exactly_the_changed_set() {
    let harness = Harness::build(INITIAL);
    for name in ["a", "b", "c"] {
        harness.supervisor.find(name).unwrap().start(true).await.unwrap();
    }
    let b_pid_before = harness.supervisor.find("b").unwrap().snapshot().core.pid;
    let c_pid_before = harness.supervisor.find("c").unwrap().snapshot().core.pid;

    // Rewrite the backing config file in place: drop `a`, change `c`'s
    // command, add `d`. `Harness` keeps the temp file alive so we reuse
    // its path directly rather than going through a public accessor.
    let config_path = harness.supervisor.config_path();
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(&config_path)
        .unwrap();
    write!(
        file,
        r#"
        [program.b]
        command = "/bin/sleep 30"
        startsecs = 0

        [program.c]
        command = "/bin/sleep 31"
        startsecs = 0

        [program.d]
        command = "/bin/sleep 30"
        startsecs = 0
        "#
    )
    .unwrap();
    file.flush().unwrap();
    drop(file);

    let report = harness.supervisor.reload().await.unwrap();

    assert_eq!(report.added, vec!["d".to_string()]);
    assert_eq!(report.changed, vec!["c".to_string()]);
    assert_eq!(report.removed, vec!["a".to_string()]);

    assert!(harness.supervisor.find("a").is_err());
    assert_eq!(harness.supervisor.find("d").unwrap().state(), ProcessState::Running);

    let c = harness.supervisor.find("c").unwrap();
    assert_eq!(c.state(), ProcessState::Running);
    assert_ne!(c.snapshot().core.pid, c_pid_before);

    let b = harness.supervisor.find("b").unwrap();
    assert_eq!(b.snapshot().core.pid, b_pid_before);
}
