//! Concrete end-to-end scenarios from the process lifecycle: a clean
//! start, a crash loop that exhausts retries into FATAL, and a graceful
//! stop that escalates to SIGKILL against a TERM-ignoring child.

use std::time::Duration;

use supd_core::ProcessState;

use crate::prelude::{wait_for, Harness};

#[tokio::test]
async fn happy_start_reaches_running_within_a_second() {
    let harness = Harness::build(
        r#"
        [program.echo-svc]
        command = "/bin/sleep 10"
        autostart = true
        startsecs = 1
        "#,
    );
    let process = harness.supervisor.find("echo-svc").unwrap();
    process.start(true).await.unwrap();

    assert_eq!(process.state(), ProcessState::Running);
    assert!(process.snapshot().core.pid > 0);

    let mut infos = Vec::new();
    harness
        .supervisor
        .manager()
        .for_each(|p| infos.push(harness.supervisor.process_info(p)));
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].statename, "RUNNING");

    process.stop(true).await.unwrap();
}

#[tokio::test]
async fn crash_loop_exhausts_retries_into_fatal() {
    let harness = Harness::build(
        r#"
        [program.boom]
        command = "/bin/false"
        autostart = false
        startsecs = 1
        startretries = 2
        "#,
    );
    let process = harness.supervisor.find("boom").unwrap();
    process.start(false).await.unwrap();

    let reached = wait_for(Duration::from_secs(5), || process.state() == ProcessState::Fatal).await;
    assert!(reached, "expected FATAL within 5s, got {:?}", process.state());

    let snapshot = process.snapshot();
    assert_eq!(snapshot.core.last_exit_status, Some(1));
    assert_eq!(snapshot.core.start_attempts, 3);
}

#[tokio::test]
async fn graceful_stop_escalates_to_kill_against_a_term_ignoring_child() {
    let harness = Harness::build(
        r#"
        [program.sig-ignore]
        command = "/bin/sh -c 'trap \"\" TERM; sleep 30'"
        autostart = false
        startsecs = 1
        stopsignal = "TERM"
        stopwaitsecs = 1
        "#,
    );
    let process = harness.supervisor.find("sig-ignore").unwrap();
    process.start(true).await.unwrap();
    assert_eq!(process.state(), ProcessState::Running);

    let started = tokio::time::Instant::now();
    process.stop(true).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(process.state(), ProcessState::Stopped);
    assert!(
        elapsed >= Duration::from_millis(900),
        "stop should wait out stopwaitsecs before escalating, took {elapsed:?}"
    );
}
