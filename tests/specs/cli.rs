//! The binary's bare `--version`/`--help` surface; subcommand dispatch
//! proper is out of scope.

use std::path::PathBuf;
use std::process::Command;

fn binary_path() -> PathBuf {
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.join("target/debug/supd")
}

#[test]
fn version_flag_prints_the_package_version_and_exits_zero() {
    let output = Command::new(binary_path()).arg("--version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("supd"), "stdout: {stdout}");
}

#[test]
fn help_flag_prints_usage_and_exits_zero() {
    let output = Command::new(binary_path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("USAGE"), "stdout: {stdout}");
}
