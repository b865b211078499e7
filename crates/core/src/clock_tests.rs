use super::*;
use std::time::Duration;

#[test]
fn fake_clock_advances_monotonically() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_secs(5));
    assert!(clock.now() >= t0 + Duration::from_secs(5));
}

#[test]
fn fake_clock_unix_seconds_tracks_advance() {
    let clock = FakeClock::new();
    clock.set_unix_seconds(1_000);
    clock.advance(Duration::from_secs(30));
    assert_eq!(clock.unix_seconds(), 1_030);
}

#[test]
fn system_clock_unix_seconds_is_nonzero() {
    assert!(SystemClock.unix_seconds() > 0);
}
