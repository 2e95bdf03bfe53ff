// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    JobEvent, JobEventKind, JobId, JobRecord, JobType, OwnerId, RepositoryId, TerminalCondition,
};
use chrono::{DateTime, Duration, Utc};

// ── Event factory functions ─────────────────────────────────────────────────

pub fn job_event(id: &str, kind: JobEventKind, repo: &str, job_type: JobType) -> JobEvent {
    JobEvent::new(
        JobId::new(id),
        kind,
        RepositoryId::new(repo),
        job_type,
        job_type.is_exclusive(),
    )
}

pub fn job_running_event(id: &str, repo: &str, job_type: JobType) -> JobEvent {
    job_event(id, JobEventKind::Running, repo, job_type)
}

pub fn job_succeeded_event(id: &str, repo: &str, job_type: JobType) -> JobEvent {
    job_event(id, JobEventKind::Succeeded, repo, job_type)
}

pub fn job_failed_event(id: &str, repo: &str, job_type: JobType) -> JobEvent {
    job_event(id, JobEventKind::Failed, repo, job_type)
}

pub fn job_delete_event(id: &str, repo: &str, job_type: JobType) -> JobEvent {
    job_event(id, JobEventKind::Delete, repo, job_type)
}

// ── Record factory functions ────────────────────────────────────────────────

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_767_225_600, 0).unwrap_or_default()
}

/// A backup record created `minutes` after the fixed test epoch.
pub fn job_record(name: &str, minutes: i64, condition: Option<TerminalCondition>) -> JobRecord {
    JobRecord {
        id: JobId::scoped("test", name),
        owner: OwnerId::new("test", "schedule"),
        job_type: JobType::Backup,
        created_at: epoch() + Duration::minutes(minutes),
        condition,
    }
}
