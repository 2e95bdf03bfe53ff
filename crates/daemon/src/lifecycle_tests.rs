// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ks_core::{EffectiveSchedule, JobType, OwnerId, RandomSchedule, ScheduleDefinition, ScheduleKey};
use ks_engine::ConcurrencyLimits;
use ks_storage::ScheduleStore;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn test_config(dir: &Path) -> Config {
    let state_dir = dir.join("state");
    Config {
        lock_path: state_dir.join("daemon.pid"),
        log_path: state_dir.join("daemon.log"),
        config_path: state_dir.join("config.toml"),
        schedules_path: state_dir.join("effective-schedules.json"),
        declarations_path: state_dir.join("schedules.toml"),
        admin_namespace: "ops".to_string(),
        dispatch_interval: Duration::from_secs(1),
        resync_interval: Duration::from_secs(60),
        concurrency: ConcurrencyLimits::new(),
        timeouts: HashMap::new(),
        history: Default::default(),
        state_dir,
    }
}

#[test]
fn startup_writes_pid_and_shutdown_removes_it() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let state = startup(&config).unwrap();
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());

    state.shutdown().unwrap();
    assert!(!config.lock_path.exists());
}

#[test]
fn startup_lock_failed_does_not_remove_existing_files() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.state_dir).unwrap();

    // Simulate a running daemon holding the lock
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)
        .unwrap();
    lock_file.lock_exclusive().unwrap();
    std::fs::write(&config.lock_path, b"12345").unwrap();

    let result = startup(&config);
    assert!(matches!(result, Err(LifecycleError::LockFailed(_))));

    // Still there, PID untouched
    assert_eq!(
        std::fs::read_to_string(&config.lock_path).unwrap(),
        "12345"
    );
    drop(lock_file);
}

#[test]
fn startup_reopens_persisted_schedules() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let owner = OwnerId::new("team-a", "nightly");
    let key = ScheduleKey::new(
        JobType::Backup,
        "s3:bucket",
        ScheduleDefinition::Random(RandomSchedule::Daily),
    );

    let state = startup(&config).unwrap();
    state
        .store
        .create("ops", EffectiveSchedule::new(key.clone(), "7 3 * * *", owner.clone()))
        .unwrap();
    state.shutdown().unwrap();

    let state = startup(&config).unwrap();
    let records = state.store.list("ops").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].generated_schedule, "7 3 * * *");
    assert!(records[0].is_referenced_by(&owner));
    state.shutdown().unwrap();
}

#[test]
fn failed_startup_removes_pid_file() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.state_dir).unwrap();
    // Written by a newer daemon
    std::fs::write(
        &config.schedules_path,
        r#"{"version":99,"namespaces":{},"saved_at":"2026-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    let result = startup(&config);
    assert!(matches!(
        result,
        Err(LifecycleError::Store(SnapshotError::UnsupportedVersion(99)))
    ));
    assert!(!config.lock_path.exists());
}
