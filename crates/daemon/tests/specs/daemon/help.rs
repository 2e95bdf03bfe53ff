//! Daemon help and version specs
//!
//! Verify ksd --help, --version, and related flags work without loading
//! configuration or acquiring the daemon lock.

use crate::prelude::*;

#[test]
fn ksd_version_shows_version() {
    for flag in ["--version", "-v", "-V"] {
        let output = ksd().arg(flag).output().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.starts_with("ksd 0.1.0"),
            "expected version for {flag}, got: {stdout}"
        );
    }
}

#[test]
fn ksd_help_shows_usage() {
    for flag in ["--help", "-h", "help"] {
        let output = ksd().arg(flag).output().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains("USAGE:"),
            "expected USAGE section for {flag}, got: {stdout}"
        );
        assert!(stdout.contains("--help"), "expected --help in output");
        assert!(stdout.contains("--version"), "expected --version in output");
    }
}

#[test]
fn ksd_unknown_arg_fails() {
    let output = ksd().arg("--bogus").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unexpected argument"),
        "expected error message, got: {stderr}"
    );
}
