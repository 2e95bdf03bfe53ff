// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-repository admission queue.
//!
//! Jobs wait in one FIFO per repository. Each dispatch tick admits heads in
//! order while the exclusivity rule allows:
//! - an exclusive head needs the repository to be idle
//! - a non-exclusive head needs no exclusive job running, and its job type
//!   below the global concurrency limit
//!
//! A blocked head blocks everything behind it in that repository.

use crate::job::{DomainJob, JobDescription};
use crate::observer::Observer;
use indexmap::IndexMap;
use ks_core::{JobId, JobType, RepositoryId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Maximum running jobs per type across all repositories. Missing or zero
/// means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcurrencyLimits {
    limits: HashMap<JobType, usize>,
}

impl ConcurrencyLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, job_type: JobType, limit: usize) -> Self {
        self.limits.insert(job_type, limit);
        self
    }

    pub fn get(&self, job_type: JobType) -> usize {
        self.limits.get(&job_type).copied().unwrap_or(0)
    }
}

impl FromIterator<(JobType, usize)> for ConcurrencyLimits {
    fn from_iter<I: IntoIterator<Item = (JobType, usize)>>(iter: I) -> Self {
        Self {
            limits: iter.into_iter().collect(),
        }
    }
}

/// Outcome of one dispatch tick
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Admitted and started (or already present downstream)
    pub admitted: Vec<JobId>,
    /// Admitted but failed to start; dropped
    pub failed: Vec<JobId>,
}

type Queues = IndexMap<RepositoryId, VecDeque<Box<dyn DomainJob>>>;

pub struct AdmissionQueue {
    observer: Arc<Observer>,
    limits: ConcurrencyLimits,
    queues: Mutex<Queues>,
    /// Serializes dispatch ticks; only the dispatcher pops heads
    dispatching: Mutex<()>,
}

impl AdmissionQueue {
    pub fn new(observer: Arc<Observer>) -> Self {
        Self {
            observer,
            limits: ConcurrencyLimits::default(),
            queues: Mutex::new(IndexMap::new()),
            dispatching: Mutex::new(()),
        }
    }

    pub fn with_concurrency_limits(mut self, limits: ConcurrencyLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn submit(&self, job: Box<dyn DomainJob>) {
        let description = job.describe();
        tracing::info!(
            job_id = %description.id,
            job_type = %description.job_type,
            repository = %description.repository,
            "job queued"
        );
        self.queues
            .lock()
            .entry(description.repository)
            .or_default()
            .push_back(job);
    }

    /// Run one admission pass over every repository.
    pub fn dispatch(&self) -> DispatchReport {
        let _tick = self.dispatching.lock();
        let mut report = DispatchReport::default();

        let repositories: Vec<RepositoryId> = self.queues.lock().keys().cloned().collect();
        for repository in repositories {
            while let Some(head) = self.peek(&repository) {
                if !self.is_admissible(&head) {
                    tracing::debug!(job = %head, "head job not admitted yet");
                    break;
                }
                let Some(job) = self.pop(&repository) else {
                    break;
                };
                self.admit(job, head, &mut report);
            }
        }

        self.queues.lock().retain(|_, queue| !queue.is_empty());
        report
    }

    fn peek(&self, repository: &RepositoryId) -> Option<JobDescription> {
        self.queues
            .lock()
            .get(repository)
            .and_then(|queue| queue.front())
            .map(|job| job.describe())
    }

    fn pop(&self, repository: &RepositoryId) -> Option<Box<dyn DomainJob>> {
        self.queues
            .lock()
            .get_mut(repository)
            .and_then(|queue| queue.pop_front())
    }

    fn is_admissible(&self, head: &JobDescription) -> bool {
        if head.exclusive {
            return !self.observer.is_any_job_running(&head.repository);
        }
        !self.observer.is_exclusive_job_running(&head.repository)
            && !self
                .observer
                .is_concurrency_limit_reached(head.job_type, self.limits.get(head.job_type))
    }

    fn admit(&self, job: Box<dyn DomainJob>, head: JobDescription, report: &mut DispatchReport) {
        // Visible to the gate before the downstream job reports in
        self.observer
            .reserve(&head.id, &head.repository, head.job_type, job.exclusive());

        match job.execute() {
            Ok(()) => {
                tracing::info!(job = %head, "job admitted");
                report.admitted.push(head.id);
            }
            Err(e) if e.is_already_exists() => {
                tracing::info!(job = %head, "job already exists, treating as admitted");
                self.observer.release(&head.id);
                report.admitted.push(head.id);
            }
            Err(e) => {
                tracing::warn!(job = %head, error = %e, "job failed to start, dropping");
                self.observer.release(&head.id);
                report.failed.push(head.id);
            }
        }
    }

    /// Total queued jobs.
    pub fn len(&self) -> usize {
        self.queues.lock().values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queued job ids for one repository, head first.
    pub fn queued_in(&self, repository: &RepositoryId) -> Vec<JobId> {
        self.queues
            .lock()
            .get(repository)
            .map(|queue| queue.iter().map(|job| job.describe().id).collect())
            .unwrap_or_default()
    }

    /// Queue depth per (namespace, job type).
    pub fn queued_by_type(&self) -> BTreeMap<(String, JobType), usize> {
        let mut depth = BTreeMap::new();
        for job in self.queues.lock().values().flatten() {
            let description = job.describe();
            let namespace = description.owner.namespace.to_string();
            *depth.entry((namespace, description.job_type)).or_insert(0) += 1;
        }
        depth
    }
}

/// Run [`AdmissionQueue::dispatch`] every `interval` until `shutdown` flips
/// to true.
pub fn spawn_dispatcher(
    queue: Arc<AdmissionQueue>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = queue.dispatch();
                    if !report.admitted.is_empty() || !report.failed.is_empty() {
                        tracing::debug!(
                            admitted = report.admitted.len(),
                            failed = report.failed.len(),
                            "dispatch tick"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("dispatcher stopped");
    })
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
