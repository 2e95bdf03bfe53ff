// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain job kinds.
//!
//! Every kind shares a [`JobBase`] (identity, repository, spec and the
//! [`Launcher`] that starts the downstream job) and adds its own arguments.

use crate::error::ExecuteError;
use ks_core::{IdGen, JobId, JobSpec, JobType, OwnerId, RepositoryId};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// A queued unit of work, admitted by the [`AdmissionQueue`](crate::AdmissionQueue).
pub trait DomainJob: Send {
    /// Start the downstream job. Must not block until it finishes.
    fn execute(&self) -> Result<(), ExecuteError>;

    /// Exclusive jobs never run alongside another job on the same repository.
    fn exclusive(&self) -> bool;

    fn describe(&self) -> JobDescription;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescription {
    pub id: JobId,
    pub owner: OwnerId,
    pub job_type: JobType,
    pub repository: RepositoryId,
    pub exclusive: bool,
}

impl fmt::Display for JobDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} on {}", self.job_type, self.id, self.repository)
    }
}

/// Everything a launcher needs to start the downstream job.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub id: JobId,
    pub owner: OwnerId,
    pub job_type: JobType,
    pub repository: RepositoryId,
    pub exclusive: bool,
    /// Kind-specific arguments, starting with the job type
    pub args: Vec<String>,
    pub spec: JobSpec,
}

/// Starts downstream jobs. Implementations report `AlreadyExists` for a
/// job id they already launched.
pub trait Launcher: Send + Sync {
    fn launch(&self, request: LaunchRequest) -> Result<(), ExecuteError>;
}

/// Shared part of every job kind
#[derive(Clone)]
pub struct JobBase {
    pub id: JobId,
    pub owner: OwnerId,
    pub repository: RepositoryId,
    pub spec: JobSpec,
    launcher: Arc<dyn Launcher>,
}

impl JobBase {
    pub fn new(
        id: JobId,
        owner: OwnerId,
        repository: RepositoryId,
        spec: JobSpec,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            id,
            owner,
            repository,
            spec,
            launcher,
        }
    }

    fn describe(&self, job_type: JobType) -> JobDescription {
        JobDescription {
            id: self.id.clone(),
            owner: self.owner.clone(),
            job_type,
            repository: self.repository.clone(),
            exclusive: job_type.is_exclusive(),
        }
    }

    fn launch(&self, job_type: JobType, extra: Vec<String>) -> Result<(), ExecuteError> {
        let mut args = vec![job_type.to_string()];
        args.extend(extra);
        self.launcher.launch(LaunchRequest {
            id: self.id.clone(),
            owner: self.owner.clone(),
            job_type,
            repository: self.repository.clone(),
            exclusive: job_type.is_exclusive(),
            args,
            spec: self.spec.clone(),
        })
    }

    /// Deserialize an optional field of the spec.
    fn spec_field<T: for<'de> Deserialize<'de>>(&self, field: &str) -> Result<Option<T>, ExecuteError> {
        match self.spec.get(field) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ExecuteError::InvalidSpec {
                    id: self.id.clone(),
                    message: format!("{field}: {e}"),
                }),
        }
    }
}

pub struct BackupJob {
    base: JobBase,
}

impl BackupJob {
    pub fn new(base: JobBase) -> Self {
        Self { base }
    }
}

impl DomainJob for BackupJob {
    fn execute(&self) -> Result<(), ExecuteError> {
        let tags: Vec<String> = self.base.spec_field("tags")?.unwrap_or_default();
        let args = tags.into_iter().flat_map(|t| ["--tag".to_string(), t]).collect();
        self.base.launch(JobType::Backup, args)
    }

    fn exclusive(&self) -> bool {
        false
    }

    fn describe(&self) -> JobDescription {
        self.base.describe(JobType::Backup)
    }
}

pub struct CheckJob {
    base: JobBase,
}

impl CheckJob {
    pub fn new(base: JobBase) -> Self {
        Self { base }
    }
}

impl DomainJob for CheckJob {
    fn execute(&self) -> Result<(), ExecuteError> {
        self.base.launch(JobType::Check, Vec::new())
    }

    fn exclusive(&self) -> bool {
        true
    }

    fn describe(&self) -> JobDescription {
        self.base.describe(JobType::Check)
    }
}

/// Snapshot retention policy applied by a prune
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PruneRetention {
    keep_last: Option<u32>,
    keep_hourly: Option<u32>,
    keep_daily: Option<u32>,
    keep_weekly: Option<u32>,
    keep_monthly: Option<u32>,
    keep_yearly: Option<u32>,
    #[serde(default)]
    keep_tags: Vec<String>,
}

impl PruneRetention {
    fn args(&self) -> Vec<String> {
        let counts = [
            ("--keep-last", self.keep_last),
            ("--keep-hourly", self.keep_hourly),
            ("--keep-daily", self.keep_daily),
            ("--keep-weekly", self.keep_weekly),
            ("--keep-monthly", self.keep_monthly),
            ("--keep-yearly", self.keep_yearly),
        ];
        let mut args = Vec::new();
        for (flag, value) in counts {
            if let Some(n) = value {
                args.push(flag.to_string());
                args.push(n.to_string());
            }
        }
        for tag in &self.keep_tags {
            args.push("--keep-tag".to_string());
            args.push(tag.clone());
        }
        args
    }
}

pub struct PruneJob {
    base: JobBase,
}

impl PruneJob {
    pub fn new(base: JobBase) -> Self {
        Self { base }
    }
}

impl DomainJob for PruneJob {
    fn execute(&self) -> Result<(), ExecuteError> {
        let retention: PruneRetention = self.base.spec_field("retention")?.unwrap_or_default();
        self.base.launch(JobType::Prune, retention.args())
    }

    fn exclusive(&self) -> bool {
        true
    }

    fn describe(&self) -> JobDescription {
        self.base.describe(JobType::Prune)
    }
}

pub struct RestoreJob {
    base: JobBase,
}

impl RestoreJob {
    pub fn new(base: JobBase) -> Self {
        Self { base }
    }
}

impl DomainJob for RestoreJob {
    fn execute(&self) -> Result<(), ExecuteError> {
        let mut args = Vec::new();
        if let Some(snapshot) = self.base.spec_field::<String>("snapshot")? {
            args.push("--snapshot".to_string());
            args.push(snapshot);
        }
        if let Some(target) = self.base.spec_field::<String>("target")? {
            args.push("--target".to_string());
            args.push(target);
        }
        self.base.launch(JobType::Restore, args)
    }

    fn exclusive(&self) -> bool {
        false
    }

    fn describe(&self) -> JobDescription {
        self.base.describe(JobType::Restore)
    }
}

pub struct ArchiveJob {
    base: JobBase,
}

impl ArchiveJob {
    pub fn new(base: JobBase) -> Self {
        Self { base }
    }
}

impl DomainJob for ArchiveJob {
    fn execute(&self) -> Result<(), ExecuteError> {
        let mut args = Vec::new();
        if let Some(target) = self.base.spec_field::<String>("target")? {
            args.push("--target".to_string());
            args.push(target);
        }
        self.base.launch(JobType::Archive, args)
    }

    fn exclusive(&self) -> bool {
        false
    }

    fn describe(&self) -> JobDescription {
        self.base.describe(JobType::Archive)
    }
}

/// Build the job kind for `job_type`.
pub fn build_job(job_type: JobType, base: JobBase) -> Result<Box<dyn DomainJob>, ExecuteError> {
    Ok(match job_type {
        JobType::Backup => Box::new(BackupJob::new(base)),
        JobType::Check => Box::new(CheckJob::new(base)),
        JobType::Prune => Box::new(PruneJob::new(base)),
        JobType::Restore => Box::new(RestoreJob::new(base)),
        JobType::Archive => Box::new(ArchiveJob::new(base)),
        JobType::Schedule => return Err(ExecuteError::Unsupported(job_type)),
    })
}

/// What the scheduler hands the materializer when a cron entry fires.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeRequest {
    pub job_type: JobType,
    pub owner: OwnerId,
    pub repository: RepositoryId,
    pub spec: JobSpec,
}

/// Turns a fired schedule into a concrete job. Supplied by the scheduler's
/// caller; the scheduler never builds jobs itself.
pub trait JobMaterializer: Send + Sync {
    fn materialize(&self, request: MaterializeRequest) -> Result<Box<dyn DomainJob>, ExecuteError>;
}

/// Materializer that names jobs `{owner}-{type}-{suffix}` in the owner's
/// namespace and builds the matching kind.
pub struct KindMaterializer<G: IdGen> {
    launcher: Arc<dyn Launcher>,
    ids: G,
}

impl<G: IdGen> KindMaterializer<G> {
    pub fn new(launcher: Arc<dyn Launcher>, ids: G) -> Self {
        Self { launcher, ids }
    }
}

impl<G: IdGen> JobMaterializer for KindMaterializer<G> {
    fn materialize(&self, request: MaterializeRequest) -> Result<Box<dyn DomainJob>, ExecuteError> {
        let name = format!(
            "{}-{}-{}",
            request.owner.name,
            request.job_type,
            self.ids.next()
        );
        let id = JobId::scoped(&request.owner.namespace, &name);
        let base = JobBase::new(
            id,
            request.owner,
            request.repository,
            request.spec,
            Arc::clone(&self.launcher),
        );
        build_job(request.job_type, base)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
