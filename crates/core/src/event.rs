// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events for downstream jobs, as delivered by a watch source.

use crate::id::{JobId, RepositoryId};
use crate::job::{JobClassification, JobType};
use serde::{Deserialize, Serialize};

/// Lifecycle transition reported for a job.
///
/// Serializes as `"job:created"`, `"job:running"`, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobEventKind {
    #[serde(rename = "job:created")]
    Create,
    #[serde(rename = "job:running")]
    Running,
    #[serde(rename = "job:updated")]
    Update,
    #[serde(rename = "job:succeeded")]
    Succeeded,
    #[serde(rename = "job:failed")]
    Failed,
    #[serde(rename = "job:deleted")]
    Delete,
}

impl JobEventKind {
    /// Terminal events fire the callbacks registered for the job.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobEventKind::Succeeded | JobEventKind::Failed | JobEventKind::Delete
        )
    }

    /// Classification after this event, given the previous one (if any).
    ///
    /// `Update` carries no state of its own: it keeps whatever was known,
    /// and a job first seen through an update is assumed to be running.
    pub fn classify(self, previous: Option<JobClassification>) -> JobClassification {
        match self {
            JobEventKind::Create | JobEventKind::Running => JobClassification::Running,
            JobEventKind::Update => previous.unwrap_or(JobClassification::Running),
            JobEventKind::Succeeded => JobClassification::Succeeded,
            JobEventKind::Failed => JobClassification::Failed,
            JobEventKind::Delete => JobClassification::Deleted,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            JobEventKind::Create => "job:created",
            JobEventKind::Running => "job:running",
            JobEventKind::Update => "job:updated",
            JobEventKind::Succeeded => "job:succeeded",
            JobEventKind::Failed => "job:failed",
            JobEventKind::Delete => "job:deleted",
        }
    }
}

/// One observation of a downstream job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: JobId,
    pub kind: JobEventKind,
    pub repository: RepositoryId,
    pub job_type: JobType,
    #[serde(default)]
    pub exclusive: bool,
}

impl JobEvent {
    pub fn new(
        id: JobId,
        kind: JobEventKind,
        repository: RepositoryId,
        job_type: JobType,
        exclusive: bool,
    ) -> Self {
        Self {
            id,
            kind,
            repository,
            job_type,
            exclusive,
        }
    }

    /// Same job, different transition.
    pub fn with_kind(&self, kind: JobEventKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    pub fn log_summary(&self) -> String {
        format!(
            "{} id={} type={} repo={}",
            self.kind.name(),
            self.id,
            self.job_type,
            self.repository
        )
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
