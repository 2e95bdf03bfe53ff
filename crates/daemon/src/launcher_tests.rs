// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ks_core::{FakeClock, JobClassification, RepositoryId, RetentionLimits, TerminalCondition};
use serde_json::json;

fn owner() -> OwnerId {
    OwnerId::new("team-a", "nightly")
}

fn request(name: &str, job_type: JobType) -> LaunchRequest {
    LaunchRequest {
        id: JobId::scoped("team-a", name),
        owner: owner(),
        job_type,
        repository: RepositoryId::new("s3:a"),
        exclusive: job_type.is_exclusive(),
        args: vec![job_type.to_string(), "--tag".to_string(), "nightly".to_string()],
        spec: json!({ "tags": ["nightly"] }),
    }
}

struct Harness {
    observer: Arc<Observer>,
    history: Arc<JobHistory>,
    launcher: CommandLauncher<FakeClock>,
}

fn harness(commands: &[(JobType, &str)]) -> Harness {
    let (observer, event_loop) = Observer::new();
    tokio::spawn(event_loop.run());
    let history = Arc::new(JobHistory::new(Arc::clone(&observer), RetentionLimits::default()));
    let launcher = CommandLauncher::new(
        Handle::current(),
        Arc::clone(&observer),
        Arc::clone(&history),
        FakeClock::new(),
    );
    launcher.set_commands(
        &owner(),
        commands
            .iter()
            .map(|(job_type, script)| (*job_type, script.to_string()))
            .collect(),
    );
    Harness {
        observer,
        history,
        launcher,
    }
}

async fn wait_for(mut done: impl FnMut() -> bool) {
    for _ in 0..400 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

fn classification(observer: &Observer, id: &JobId) -> Option<JobClassification> {
    observer.get(id).and_then(|job| job.classification)
}

#[tokio::test]
async fn successful_command_reports_success() {
    let h = harness(&[(JobType::Backup, "exit 0")]);
    let req = request("nightly-backup-1", JobType::Backup);
    let id = req.id.clone();

    h.launcher.launch(req).unwrap();

    wait_for(|| classification(&h.observer, &id) == Some(JobClassification::Succeeded)).await;
    wait_for(|| h.history.records(&owner())[0].condition.is_some()).await;
    assert_eq!(
        h.history.records(&owner())[0].condition,
        Some(TerminalCondition::Succeeded)
    );
    assert!(!h.launcher.is_active(&id));
    assert_eq!(h.observer.stats().namespace("team-a").succeeded, 1);
}

#[tokio::test]
async fn failing_command_reports_failure() {
    let h = harness(&[(JobType::Check, "echo broken >&2; exit 3")]);
    let req = request("nightly-check-1", JobType::Check);
    let id = req.id.clone();

    h.launcher.launch(req).unwrap();

    wait_for(|| classification(&h.observer, &id) == Some(JobClassification::Failed)).await;
    assert_eq!(h.observer.stats().namespace("team-a").failed, 1);
}

#[tokio::test]
async fn command_sees_job_environment() {
    let script = r#"test "$KS_JOB_ID" = team-a/nightly-backup-1 \
        && test "$KS_JOB_NAME" = nightly-backup-1 \
        && test "$KS_JOB_TYPE" = backup \
        && test "$KS_NAMESPACE" = team-a \
        && test "$KS_OWNER" = team-a/nightly \
        && test "$KS_REPOSITORY" = s3:a \
        && test "$KS_JOB_ARGS" = '["backup","--tag","nightly"]'"#;
    let h = harness(&[(JobType::Backup, script)]);
    let req = request("nightly-backup-1", JobType::Backup);
    let id = req.id.clone();

    h.launcher.launch(req).unwrap();

    wait_for(|| {
        classification(&h.observer, &id).is_some_and(|c| c != JobClassification::Running)
    })
    .await;
    assert_eq!(
        classification(&h.observer, &id),
        Some(JobClassification::Succeeded)
    );
}

#[tokio::test]
async fn slow_command_times_out() {
    let h = harness(&[(JobType::Prune, "sleep 30")]);
    let launcher = h
        .launcher
        .with_timeouts(HashMap::from([(JobType::Prune, Duration::from_millis(100))]));
    let req = request("nightly-prune-1", JobType::Prune);
    let id = req.id.clone();

    launcher.launch(req).unwrap();
    assert!(launcher.is_active(&id));

    wait_for(|| classification(&h.observer, &id) == Some(JobClassification::Failed)).await;
    assert_eq!(launcher.active_count(), 0);
}

#[tokio::test]
async fn duplicate_launch_is_already_exists() {
    let h = harness(&[(JobType::Backup, "sleep 1")]);

    h.launcher.launch(request("nightly-backup-1", JobType::Backup)).unwrap();
    let err = h
        .launcher
        .launch(request("nightly-backup-1", JobType::Backup))
        .unwrap_err();

    assert!(err.is_already_exists());
    assert_eq!(h.history.records(&owner()).len(), 1);
}

#[tokio::test]
async fn missing_command_is_a_launch_error() {
    let h = harness(&[(JobType::Backup, "exit 0")]);

    let err = h
        .launcher
        .launch(request("nightly-check-1", JobType::Check))
        .unwrap_err();

    assert!(matches!(err, ExecuteError::Launch { .. }));
    assert!(h.history.records(&owner()).is_empty());
    assert_eq!(h.launcher.active_count(), 0);
}

#[tokio::test]
async fn removed_owner_can_no_longer_launch() {
    let h = harness(&[(JobType::Backup, "exit 0")]);
    h.launcher.remove_owner(&owner());

    let err = h
        .launcher
        .launch(request("nightly-backup-1", JobType::Backup))
        .unwrap_err();
    assert!(!err.is_already_exists());
}

#[test]
fn tail_keeps_the_end_on_char_boundaries() {
    assert_eq!(tail("short", 10), "short");
    assert_eq!(tail("abcdef", 3), "def");
    assert_eq!(tail("aé", 1), "");
    assert_eq!(tail("aéb", 2), "b");
}
