// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ks_core::test_support::{job_record, job_running_event, job_succeeded_event};
use ks_core::JobType;
use std::time::Duration;

const REPO: &str = "s3:backups";

fn owner() -> OwnerId {
    OwnerId::new("test", "schedule")
}

/// History with `names` launched one minute apart, each reported running.
fn history_with(observer: &Arc<Observer>, limits: RetentionLimits, names: &[&str]) -> JobHistory {
    let history = JobHistory::new(Arc::clone(observer), RetentionLimits::default());
    history.set_limits(&owner(), limits);
    for (minute, name) in names.iter().enumerate() {
        history.record_started(
            job_record(name, minute as i64, None),
            RepositoryId::new(REPO),
            false,
        );
        observer.process(job_running_event(
            &format!("test/{name}"),
            REPO,
            JobType::Backup,
        ));
    }
    history
}

async fn wait_for(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

fn names(records: &[JobRecord]) -> Vec<String> {
    records.iter().map(|r| r.id.name().to_string()).collect()
}

#[test]
fn owner_limits_fall_back_to_operator_defaults() {
    let (observer, _loop) = Observer::new();
    let history = JobHistory::new(observer, RetentionLimits::new(Some(5), Some(2)));

    assert_eq!(
        history.limits(&owner()),
        RetentionLimits::new(Some(5), Some(2))
    );

    history.set_limits(&owner(), RetentionLimits::new(Some(1), None));
    assert_eq!(
        history.limits(&owner()),
        RetentionLimits::new(Some(1), Some(2))
    );
}

#[test]
fn finishing_a_job_prunes_oldest_successes() {
    let (observer, _loop) = Observer::new();
    let history = history_with(&observer, RetentionLimits::new(Some(2), None), &["a", "b", "c"]);

    assert!(history.record_finished(&JobId::new("test/a"), TerminalCondition::Succeeded).is_empty());
    assert!(history.record_finished(&JobId::new("test/b"), TerminalCondition::Succeeded).is_empty());
    let pruned = history.record_finished(&JobId::new("test/c"), TerminalCondition::Succeeded);

    assert_eq!(names(&pruned), vec!["a"]);
    assert_eq!(names(&history.records(&owner())), vec!["b", "c"]);
    assert!(!history.contains(&JobId::new("test/a")));
}

#[test]
fn failed_jobs_use_the_failed_limit() {
    let (observer, _loop) = Observer::new();
    let history = history_with(&observer, RetentionLimits::new(None, Some(1)), &["a", "b", "c"]);

    history.record_finished(&JobId::new("test/a"), TerminalCondition::Failed);
    history.record_finished(&JobId::new("test/b"), TerminalCondition::Succeeded);
    let pruned = history.record_finished(&JobId::new("test/c"), TerminalCondition::Failed);

    assert_eq!(names(&pruned), vec!["a"]);
    assert_eq!(names(&history.records(&owner())), vec!["b", "c"]);
}

#[test]
fn running_jobs_are_never_pruned() {
    let (observer, _loop) = Observer::new();
    let history = history_with(&observer, RetentionLimits::keep_jobs(0), &["a", "b"]);

    let pruned = history.record_finished(&JobId::new("test/b"), TerminalCondition::Succeeded);

    assert_eq!(names(&pruned), vec!["b"]);
    let remaining = history.records(&owner());
    assert_eq!(names(&remaining), vec!["a"]);
    assert!(remaining[0].is_running());
}

#[test]
fn unknown_job_is_ignored() {
    let (observer, _loop) = Observer::new();
    let history = history_with(&observer, RetentionLimits::keep_jobs(0), &["a"]);

    assert!(history
        .record_finished(&JobId::new("test/ghost"), TerminalCondition::Failed)
        .is_empty());
    assert_eq!(history.records(&owner()).len(), 1);
}

#[tokio::test]
async fn pruned_jobs_leave_the_observer() {
    let (observer, event_loop) = Observer::new();
    tokio::spawn(event_loop.run());
    let history = history_with(&observer, RetentionLimits::new(Some(1), None), &["a", "b"]);

    observer.process(job_succeeded_event("test/a", REPO, JobType::Backup));
    history.record_finished(&JobId::new("test/a"), TerminalCondition::Succeeded);
    history.record_finished(&JobId::new("test/b"), TerminalCondition::Succeeded);

    let gone = JobId::new("test/a");
    wait_for(|| observer.get(&gone).is_none()).await;
    assert!(observer.get(&JobId::new("test/b")).is_some());
}

#[test]
fn observer_callback_records_terminal_condition() {
    let (observer, _loop) = Observer::new();
    let history = Arc::new(history_with(&observer, RetentionLimits::default(), &["a"]));
    let id = JobId::new("test/a");

    let sink = Arc::clone(&history);
    observer.register_callback(&id, Box::new(move |job: &ObservableJob| sink.on_terminal(job)));
    observer.process(job_succeeded_event("test/a", REPO, JobType::Backup));

    let records = history.records(&owner());
    assert_eq!(records[0].condition, Some(TerminalCondition::Succeeded));
}

#[test]
fn deleted_job_is_forgotten() {
    let (observer, _loop) = Observer::new();
    let history = history_with(&observer, RetentionLimits::default(), &["a", "b"]);
    let mut job = observer.get(&JobId::new("test/a")).unwrap();
    job.classification = Some(JobClassification::Deleted);

    history.on_terminal(&job).unwrap();

    assert_eq!(names(&history.records(&owner())), vec!["b"]);
}

#[test]
fn removing_an_owner_drops_its_history() {
    let (observer, _loop) = Observer::new();
    let history = history_with(&observer, RetentionLimits::keep_jobs(3), &["a"]);

    history.remove_owner(&owner());

    assert!(history.records(&owner()).is_empty());
    assert!(history.limits(&owner()).is_unbounded());
}
