// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job kinds, lifecycle classification and historical job records.

use crate::id::JobId;
use crate::namespace::OwnerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque, kind-specific payload carried from a declaration to the
/// materializer. The scheduler never inspects it.
pub type JobSpec = serde_json::Value;

/// Kind of work a job performs against a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Backup,
    Check,
    Prune,
    Restore,
    Archive,
    Schedule,
}

impl JobType {
    /// Every job type, in declaration order.
    pub const ALL: [JobType; 6] = [
        JobType::Backup,
        JobType::Check,
        JobType::Prune,
        JobType::Restore,
        JobType::Archive,
        JobType::Schedule,
    ];

    /// Exclusive kinds must not run concurrently with any other job on the
    /// same repository.
    pub fn is_exclusive(self) -> bool {
        matches!(self, JobType::Check | JobType::Prune)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Backup => "backup",
            JobType::Check => "check",
            JobType::Prune => "prune",
            JobType::Restore => "restore",
            JobType::Archive => "archive",
            JobType::Schedule => "schedule",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job type: {0}")]
pub struct ParseJobTypeError(pub String);

impl FromStr for JobType {
    type Err = ParseJobTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseJobTypeError(s.to_string()))
    }
}

/// Last-known lifecycle state of an observed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobClassification {
    Running,
    Succeeded,
    Failed,
    Deleted,
}

impl JobClassification {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobClassification::Running)
    }
}

impl fmt::Display for JobClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobClassification::Running => write!(f, "running"),
            JobClassification::Succeeded => write!(f, "succeeded"),
            JobClassification::Failed => write!(f, "failed"),
            JobClassification::Deleted => write!(f, "deleted"),
        }
    }
}

/// Terminal condition of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalCondition {
    Succeeded,
    Failed,
}

/// Historical record of a materialized job, as seen by the retention engine.
///
/// A record without a terminal condition is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub owner: OwnerId,
    pub job_type: JobType,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub condition: Option<TerminalCondition>,
}

impl JobRecord {
    pub fn new(id: JobId, owner: OwnerId, job_type: JobType, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            job_type,
            created_at,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: TerminalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_running(&self) -> bool {
        self.condition.is_none()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
