// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule declarations.
//!
//! A declaration names an owner, the repository it backs up to, its history
//! limits, and one `schedule` plus `command` per job type:
//!
//! ```toml
//! [[schedule]]
//! namespace = "team-a"
//! name = "nightly"
//! repository = "s3:backups/team-a"
//! history = { successful = 3, failed = 2 }
//!
//! [schedule.jobs.backup]
//! schedule = "@daily-random"
//! command = "restic backup /srv"
//! spec = { tags = ["nightly"] }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ks_core::{JobSpec, JobType, OwnerId, RepositoryId, RetentionLimits, ScheduleDefinition};
use ks_engine::{Declaration, ScheduledJob};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse declarations: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{owner}: {message}")]
    Invalid { owner: String, message: String },
    #[error("{0} is declared more than once")]
    Duplicate(OwnerId),
}

/// One declared owner, with what the daemon needs besides the schedules.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredSchedule {
    pub declaration: Declaration,
    pub history: RetentionLimits,
    /// Shell command run for each declared job type
    pub commands: BTreeMap<JobType, String>,
}

impl DeclaredSchedule {
    pub fn owner(&self) -> &OwnerId {
        &self.declaration.owner
    }
}

/// Where the daemon reads declarations from on every resync.
#[async_trait]
pub trait DeclarationSource: Send + Sync {
    async fn load(&self) -> Result<Vec<DeclaredSchedule>, DeclarationError>;
}

/// Declarations read from a TOML file. A missing file declares nothing.
pub struct FileDeclarations {
    path: PathBuf,
}

impl FileDeclarations {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DeclarationSource for FileDeclarations {
    async fn load(&self) -> Result<Vec<DeclaredSchedule>, DeclarationError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no declarations file");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(DeclarationError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        parse_declarations(&content)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarationsFile {
    #[serde(default)]
    schedule: Vec<ScheduleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScheduleEntry {
    namespace: String,
    name: String,
    repository: String,
    #[serde(default)]
    history: RetentionLimits,
    #[serde(default)]
    jobs: BTreeMap<String, JobEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobEntry {
    schedule: String,
    command: String,
    #[serde(default)]
    spec: JobSpec,
}

/// Parse and validate a declarations document.
pub fn parse_declarations(content: &str) -> Result<Vec<DeclaredSchedule>, DeclarationError> {
    let file: DeclarationsFile = toml::from_str(content)?;
    let mut seen = HashSet::new();
    let mut declared = Vec::with_capacity(file.schedule.len());

    for entry in file.schedule {
        let owner = OwnerId::new(entry.namespace.trim(), entry.name.trim());
        let invalid = |message: String| DeclarationError::Invalid {
            owner: owner.to_string(),
            message,
        };
        if owner.namespace.is_empty() || owner.name.is_empty() {
            return Err(invalid("namespace and name must not be empty".to_string()));
        }
        // Refs are persisted as "namespace/name" and split at the first '/'
        if owner.namespace.contains('/') || owner.name.contains('/') {
            return Err(invalid("namespace and name must not contain '/'".to_string()));
        }
        let repository = entry.repository.trim();
        if repository.is_empty() {
            return Err(invalid("repository must not be empty".to_string()));
        }

        let mut jobs = Vec::with_capacity(entry.jobs.len());
        let mut commands = BTreeMap::new();
        for (name, job) in entry.jobs {
            let job_type: JobType = name
                .parse()
                .map_err(|e| invalid(format!("{e}")))?;
            if job_type == JobType::Schedule {
                return Err(invalid("job type 'schedule' cannot be declared".to_string()));
            }
            if job.command.trim().is_empty() {
                return Err(invalid(format!("{job_type} command must not be empty")));
            }
            jobs.push(ScheduledJob::new(
                job_type,
                ScheduleDefinition::parse(&job.schedule),
                job.spec,
            ));
            commands.insert(job_type, job.command);
        }

        if !seen.insert(owner.clone()) {
            return Err(DeclarationError::Duplicate(owner));
        }
        declared.push(DeclaredSchedule {
            declaration: Declaration {
                owner,
                repository: RepositoryId::new(repository),
                jobs,
            },
            history: entry.history,
            commands,
        });
    }

    Ok(declared)
}

#[cfg(test)]
#[path = "declarations_tests.rs"]
mod tests;
