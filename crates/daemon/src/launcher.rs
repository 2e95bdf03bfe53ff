// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs admitted jobs as child processes.
//!
//! [`CommandLauncher`] is both the execution sink and the watch source: it
//! starts the owner's declared command for the job type with `sh -c` and
//! reports the child's lifecycle to the [`Observer`]. Launching never waits
//! for the child.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use ks_core::{Clock, JobEvent, JobEventKind, JobId, JobRecord, JobType, OwnerId};
use ks_engine::{ExecuteError, LaunchRequest, Launcher, ObservableJob, Observer};
use parking_lot::{Mutex, RwLock};
use tokio::process::Command;
use tokio::runtime::Handle;

use crate::config::DEFAULT_JOB_TIMEOUT;
use crate::history::JobHistory;

/// Shell used to run declared commands
const SHELL: &str = "sh";

/// Stderr kept in the log when a job fails
const STDERR_TAIL: usize = 2048;

pub struct CommandLauncher<C: Clock> {
    handle: Handle,
    observer: Arc<Observer>,
    history: Arc<JobHistory>,
    clock: C,
    commands: RwLock<HashMap<OwnerId, BTreeMap<JobType, String>>>,
    timeouts: HashMap<JobType, Duration>,
    /// Jobs whose child has not exited yet
    active: Arc<Mutex<HashSet<JobId>>>,
}

impl<C: Clock> CommandLauncher<C> {
    pub fn new(handle: Handle, observer: Arc<Observer>, history: Arc<JobHistory>, clock: C) -> Self {
        Self {
            handle,
            observer,
            history,
            clock,
            commands: RwLock::new(HashMap::new()),
            timeouts: HashMap::new(),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_timeouts(mut self, timeouts: HashMap<JobType, Duration>) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Replace the commands declared by `owner`.
    pub fn set_commands(&self, owner: &OwnerId, commands: BTreeMap<JobType, String>) {
        self.commands.write().insert(owner.clone(), commands);
    }

    pub fn remove_owner(&self, owner: &OwnerId) {
        self.commands.write().remove(owner);
    }

    pub fn is_active(&self, id: &JobId) -> bool {
        self.active.lock().contains(id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    fn command_for(&self, owner: &OwnerId, job_type: JobType) -> Option<String> {
        self.commands
            .read()
            .get(owner)
            .and_then(|commands| commands.get(&job_type))
            .cloned()
    }

    fn timeout_for(&self, job_type: JobType) -> Duration {
        self.timeouts
            .get(&job_type)
            .copied()
            .unwrap_or(DEFAULT_JOB_TIMEOUT)
    }
}

impl<C: Clock> Launcher for CommandLauncher<C> {
    fn launch(&self, request: LaunchRequest) -> Result<(), ExecuteError> {
        let Some(script) = self.command_for(&request.owner, request.job_type) else {
            return Err(ExecuteError::Launch {
                id: request.id,
                message: format!(
                    "{} declares no {} command",
                    request.owner, request.job_type
                ),
            });
        };

        let args = serde_json::to_string(&request.args).map_err(|e| ExecuteError::Launch {
            id: request.id.clone(),
            message: e.to_string(),
        })?;

        if self.history.contains(&request.id) || !self.active.lock().insert(request.id.clone()) {
            return Err(ExecuteError::AlreadyExists(request.id));
        }

        let mut cmd = Command::new(SHELL);
        cmd.arg("-c")
            .arg(&script)
            .env("KS_JOB_ID", request.id.as_str())
            .env("KS_JOB_NAME", request.id.name())
            .env("KS_JOB_TYPE", request.job_type.as_str())
            .env("KS_NAMESPACE", &*request.owner.namespace)
            .env("KS_OWNER", request.owner.to_string())
            .env("KS_REPOSITORY", request.repository.as_str())
            .env("KS_JOB_ARGS", args)
            .env("KS_JOB_SPEC", request.spec.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        self.history.record_started(
            JobRecord::new(
                request.id.clone(),
                request.owner.clone(),
                request.job_type,
                self.clock.now(),
            ),
            request.repository.clone(),
            request.exclusive,
        );
        let history = Arc::clone(&self.history);
        self.observer.register_callback(
            &request.id,
            Box::new(move |job: &ObservableJob| history.on_terminal(job)),
        );

        let event = JobEvent::new(
            request.id.clone(),
            JobEventKind::Create,
            request.repository.clone(),
            request.job_type,
            request.exclusive,
        );
        self.observer.publish(event.clone());

        tracing::info!(
            job_id = %request.id,
            job_type = %request.job_type,
            repository = %request.repository,
            "launching job"
        );
        self.handle.spawn(supervise(
            cmd,
            event,
            self.timeout_for(request.job_type),
            Arc::clone(&self.observer),
            Arc::clone(&self.active),
        ));
        Ok(())
    }
}

/// Run the child to completion and report how it ended.
async fn supervise(
    mut cmd: Command,
    event: JobEvent,
    timeout: Duration,
    observer: Arc<Observer>,
    active: Arc<Mutex<HashSet<JobId>>>,
) {
    let outcome = match cmd.spawn() {
        Ok(child) => {
            observer.publish(event.with_kind(JobEventKind::Running));
            // The child is killed on drop if the timeout elapses
            match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(Ok(output)) if output.status.success() => Ok(()),
                Ok(Ok(output)) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(format!(
                        "exited with {}: {}",
                        output.status,
                        tail(stderr.trim(), STDERR_TAIL)
                    ))
                }
                Ok(Err(e)) => Err(format!("wait failed: {e}")),
                Err(_elapsed) => Err(format!("timed out after {}s", timeout.as_secs())),
            }
        }
        Err(e) => Err(format!("spawn failed: {e}")),
    };

    active.lock().remove(&event.id);
    match outcome {
        Ok(()) => {
            tracing::info!(job_id = %event.id, "job succeeded");
            observer.publish(event.with_kind(JobEventKind::Succeeded));
        }
        Err(reason) => {
            tracing::warn!(job_id = %event.id, reason = %reason, "job failed");
            observer.publish(event.with_kind(JobEventKind::Failed));
        }
    }
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
