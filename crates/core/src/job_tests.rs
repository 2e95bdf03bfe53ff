// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[yare::parameterized(
    backup   = { JobType::Backup,   false },
    check    = { JobType::Check,    true },
    prune    = { JobType::Prune,    true },
    restore  = { JobType::Restore,  false },
    archive  = { JobType::Archive,  false },
    schedule = { JobType::Schedule, false },
)]
fn job_type_exclusivity(job_type: JobType, exclusive: bool) {
    assert_eq!(job_type.is_exclusive(), exclusive);
}

#[test]
fn job_type_display_and_parse_agree() {
    for job_type in JobType::ALL {
        let parsed: JobType = job_type.to_string().parse().unwrap();
        assert_eq!(parsed, job_type);
    }
}

#[test]
fn job_type_parse_is_case_insensitive() {
    assert_eq!("PRUNE".parse::<JobType>().unwrap(), JobType::Prune);
}

#[test]
fn job_type_parse_rejects_unknown() {
    let err = "snapshot".parse::<JobType>().unwrap_err();
    assert_eq!(err.to_string(), "unknown job type: snapshot");
}

#[test]
fn job_type_serde_lowercase() {
    assert_eq!(serde_json::to_string(&JobType::Archive).unwrap(), "\"archive\"");
}

#[test]
fn classification_terminal() {
    assert!(!JobClassification::Running.is_terminal());
    assert!(JobClassification::Succeeded.is_terminal());
    assert!(JobClassification::Failed.is_terminal());
    assert!(JobClassification::Deleted.is_terminal());
}

#[test]
fn job_record_running_until_condition_set() {
    let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let record = JobRecord::new(
        JobId::new("ns/backup-1"),
        OwnerId::new("ns", "nightly"),
        JobType::Backup,
        at,
    );
    assert!(record.is_running());

    let done = record.with_condition(TerminalCondition::Failed);
    assert!(!done.is_running());
    assert_eq!(done.condition, Some(TerminalCondition::Failed));
}
