//! Rotation scenario from the invariants table: capped max-bytes, a fixed
//! backup count, and no `.N+1` left behind after many small writes.

use supd_log::RotatingLog;

#[test]
fn many_small_writes_keep_the_backup_set_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svc.log");
    let log = RotatingLog::open(&path, 1024, 3).unwrap();

    for _ in 0..10_000 {
        log.write(b"x").unwrap();
    }

    let live_size = std::fs::metadata(&path).unwrap().len();
    assert!(live_size <= 1024);

    for n in 1..=3 {
        let backup = dir.path().join(format!("svc.log.{n}"));
        assert!(
            std::fs::metadata(&backup).is_ok(),
            "expected backup {n} to exist ({backup:?})"
        );
    }
    assert!(
        std::fs::metadata(dir.path().join("svc.log.4")).is_err(),
        "a 4th backup should never exist with backups=3"
    );
}

#[test]
fn read_at_negative_offset_with_nonzero_length_is_bad_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let log = RotatingLog::open(dir.path().join("svc.log"), 1024, 1).unwrap();
    log.write(b"hello world").unwrap();

    let err = log.read_at(-5, 3).unwrap_err();
    assert!(matches!(err, supd_core::SupdError::BadArguments(_)));
}

#[test]
fn tail_read_past_the_end_signals_overflow() {
    let dir = tempfile::tempdir().unwrap();
    let log = RotatingLog::open(dir.path().join("svc.log"), 1024, 1).unwrap();
    log.write(b"hello").unwrap();

    let (chunk, new_offset, overflow) = log.tail_read(100, 0).unwrap();
    assert_eq!(chunk, "");
    assert_eq!(new_offset, 5);
    assert!(overflow);
}
