// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared by the queue, job kinds and observer

use ks_core::{JobId, JobType};
use thiserror::Error;

/// Errors returned by [`DomainJob::execute`](crate::DomainJob::execute)
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The downstream job is already present. The queue treats this as
    /// success so re-admission after a restart is idempotent.
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("failed to launch {id}: {message}")]
    Launch { id: JobId, message: String },
    #[error("invalid spec for {id}: {message}")]
    InvalidSpec { id: JobId, message: String },
    #[error("job type {0} cannot be materialized")]
    Unsupported(JobType),
}

impl ExecuteError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ExecuteError::AlreadyExists(_))
    }
}

/// Error returned by an observer callback. Logged, never propagated.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("{0}")]
    Failed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
