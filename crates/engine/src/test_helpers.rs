// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{DomainJob, ExecuteError, JobDescription, LaunchRequest, Launcher};
use ks_core::{JobId, JobType, OwnerId, RepositoryId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Launcher that records requests and can be told to fail.
#[derive(Clone, Default)]
pub(crate) struct FakeLauncher {
    launched: Arc<Mutex<Vec<LaunchRequest>>>,
    fail_with: Arc<Mutex<Option<fn(JobId) -> ExecuteError>>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> Vec<LaunchRequest> {
        self.launched.lock().clone()
    }

    pub fn fail_with(&self, make: fn(JobId) -> ExecuteError) {
        *self.fail_with.lock() = Some(make);
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, request: LaunchRequest) -> Result<(), ExecuteError> {
        if let Some(make) = *self.fail_with.lock() {
            return Err(make(request.id));
        }
        self.launched.lock().push(request);
        Ok(())
    }
}

/// Job that appends its id to a shared log when executed.
pub(crate) struct StubJob {
    description: JobDescription,
    log: Arc<Mutex<Vec<String>>>,
    result: fn(JobId) -> Result<(), ExecuteError>,
}

impl StubJob {
    pub fn new(name: &str, repo: &str, job_type: JobType, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            description: JobDescription {
                id: JobId::scoped("ns", name),
                owner: OwnerId::new("ns", "owner"),
                job_type,
                repository: RepositoryId::new(repo),
                exclusive: job_type.is_exclusive(),
            },
            log: Arc::clone(log),
            result: |_| Ok(()),
        }
    }

    pub fn failing(mut self, result: fn(JobId) -> Result<(), ExecuteError>) -> Self {
        self.result = result;
        self
    }

    pub fn boxed(self) -> Box<dyn DomainJob> {
        Box::new(self)
    }
}

impl DomainJob for StubJob {
    fn execute(&self) -> Result<(), ExecuteError> {
        self.log.lock().push(self.description.id.name().to_string());
        (self.result)(self.description.id.clone())
    }

    fn exclusive(&self) -> bool {
        self.description.exclusive
    }

    fn describe(&self) -> JobDescription {
        self.description.clone()
    }
}
