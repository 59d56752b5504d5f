//! Command-line behaviour of the `tilecast-display` binary.  Only paths that
//! exit before the tick loop starts are exercised here.

use std::process::Command;

fn display() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tilecast-display"))
}

#[test]
fn test_help_exits_successfully() {
    // Act
    let output = display().arg("-h").output().expect("binary must run");

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("--file"));
}

#[test]
fn test_override_without_equals_sign_fails() {
    let output = display().args(["-c", "NOEQUALS"]).output().expect("binary must run");

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_unknown_option_fails() {
    let output = display().arg("--bogus").output().expect("binary must run");

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_config_file_fails_with_path_in_message() {
    let output = display()
        .args(["-f", "/nonexistent/tilecast/display.toml"])
        .output()
        .expect("binary must run");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/nonexistent/tilecast/display.toml"), "stderr: {stderr}");
}

#[test]
fn test_out_of_range_port_is_rejected() {
    let output = display()
        .args(["-c", "EVENT_SERVER_PORT=70000"])
        .output()
        .expect("binary must run");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("EVENT_SERVER_PORT"), "stderr: {stderr}");
}
