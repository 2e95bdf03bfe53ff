//! Daemon lifecycle specs
//!
//! Verify startup configuration errors, single-instance locking, graceful
//! shutdown, and that generated schedules survive a restart.

use crate::prelude::*;

const DECLARATIONS: &str = r#"
[[schedule]]
namespace = "team-a"
name = "nightly"
repository = "s3:backups/shared"
jobs.backup = { schedule = "@daily-random", command = "true" }

[[schedule]]
namespace = "team-b"
name = "nightly"
repository = "s3:backups/shared"
jobs.backup = { schedule = "@daily-random", command = "true" }
"#;

fn stored_schedules(state: &StateDir) -> Vec<serde_json::Value> {
    let raw = state.read("effective-schedules.json");
    let Ok(snapshot) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return Vec::new();
    };
    snapshot["namespaces"][ADMIN_NAMESPACE]
        .as_object()
        .map(|records| records.values().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn missing_admin_namespace_fails_startup() {
    let state = StateDir::new();
    let output = ksd().env("KS_STATE_DIR", state.path()).output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("MissingAdminNamespace"),
        "expected namespace error, got: {stderr}"
    );
    assert!(!state.join("daemon.pid").exists());
}

#[test]
fn second_daemon_reports_already_running() {
    let mut state = StateDir::new();
    let pid = state.start();

    let output = state.ksd().output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ksd is already running"), "got: {stderr}");
    assert!(stderr.contains(&pid.to_string()), "expected pid, got: {stderr}");
    assert_eq!(state.read("daemon.pid").trim(), pid.to_string());
}

#[test]
fn sigterm_stops_daemon_and_removes_pid_file() {
    let mut state = StateDir::new();
    let pid = state.start();

    let status = state.stop(pid);

    assert!(status.success(), "daemon exited with {status}");
    assert!(!state.join("daemon.pid").exists());
    let log = state.read("daemon.log");
    assert!(log.contains(&format!("--- ksd: starting (pid: {pid})")));
    assert!(log.contains("Daemon stopped"));
}

#[test]
fn owners_share_one_generated_schedule_across_restarts() {
    let mut state = StateDir::new();
    state.file("schedules.toml", DECLARATIONS);

    let pid = state.start();
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || stored_schedules(&state).len() == 1),
        "expected one effective schedule"
    );
    let first = stored_schedules(&state);
    assert_eq!(first[0]["schedule_refs"].as_array().unwrap().len(), 2);
    state.stop(pid);

    let pid = state.start();
    // Give the restarted daemon a resync before comparing
    std::thread::sleep(std::time::Duration::from_millis(1500));
    let second = stored_schedules(&state);
    assert_eq!(
        first[0]["generated_schedule"], second[0]["generated_schedule"],
        "generated schedule changed across restart"
    );
    state.stop(pid);
}

#[test]
fn dropping_all_declarations_deletes_the_schedule() {
    let mut state = StateDir::new();
    state.file("schedules.toml", DECLARATIONS);
    let pid = state.start();
    assert!(wait_for(SPEC_WAIT_MAX_MS, || stored_schedules(&state).len() == 1));

    state.file("schedules.toml", "");

    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || stored_schedules(&state).is_empty()),
        "orphaned schedule was not deleted"
    );
    state.stop(pid);
}
