// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron registrations per owner.
//!
//! [`Scheduler::sync`] replaces every registration of one owner with the
//! declaration's current job list. Schedules are resolved through the
//! dedup resolver before the lock is taken; the lock only covers
//! remove-then-register on the cron table.

use crate::cron::{CronError, CronSchedule, CronTable, EntryId};
use crate::job::{JobMaterializer, MaterializeRequest};
use crate::queue::AdmissionQueue;
use crate::resolver::{ResolveError, ScheduleResolver};
use chrono::{DateTime, Utc};
use ks_core::{Clock, JobSpec, JobType, OwnerId, RepositoryId, ScheduleDefinition, ScheduleKey};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid {job_type} schedule: {source}")]
    InvalidSchedule {
        job_type: JobType,
        #[source]
        source: CronError,
    },
    #[error("schedule resolution failed: {0}")]
    Resolve(#[from] ResolveError),
}

/// One scheduled job type of a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledJob {
    pub job_type: JobType,
    pub schedule: ScheduleDefinition,
    pub spec: JobSpec,
}

impl ScheduledJob {
    pub fn new(job_type: JobType, schedule: impl Into<ScheduleDefinition>, spec: JobSpec) -> Self {
        Self {
            job_type,
            schedule: schedule.into(),
            spec,
        }
    }
}

/// Everything the declaration source supplies for one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub owner: OwnerId,
    pub repository: RepositoryId,
    pub jobs: Vec<ScheduledJob>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    /// Registered job types and the concrete expression each fires on
    pub registered: Vec<(JobType, String)>,
    /// Job types skipped because their schedule is malformed
    pub errors: Vec<SchedulerError>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone)]
struct FireAction {
    owner: OwnerId,
    job_type: JobType,
    repository: RepositoryId,
    spec: JobSpec,
    materializer: Arc<dyn JobMaterializer>,
}

struct Registration {
    job_type: JobType,
    entry: EntryId,
}

#[derive(Default)]
struct State {
    table: CronTable<FireAction>,
    entries: HashMap<OwnerId, Vec<Registration>>,
}

pub struct Scheduler<C: Clock> {
    clock: C,
    resolver: Arc<ScheduleResolver>,
    queue: Arc<AdmissionQueue>,
    state: Mutex<State>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(resolver: Arc<ScheduleResolver>, queue: Arc<AdmissionQueue>, clock: C) -> Self {
        Self {
            clock,
            resolver,
            queue,
            state: Mutex::new(State::default()),
        }
    }

    /// Replace all registrations of `declaration.owner`.
    ///
    /// A malformed schedule skips only its job type and is reported in the
    /// returned [`SyncReport`]. Store failures abort the sync and leave the
    /// previous registrations in place.
    pub fn sync(
        &self,
        declaration: &Declaration,
        materializer: Arc<dyn JobMaterializer>,
    ) -> Result<SyncReport, SchedulerError> {
        let owner = &declaration.owner;
        let now = self.clock.now();
        let mut report = SyncReport::default();
        let mut parsed = Vec::new();
        let mut keep = Vec::new();

        for job in &declaration.jobs {
            let key = ScheduleKey::new(
                job.job_type,
                declaration.repository.clone(),
                job.schedule.clone(),
            );
            let expr = self.resolver.resolve(owner, &key)?;
            if key.original.is_random() {
                keep.push(key);
            }
            match CronSchedule::parse(&expr, &now) {
                Ok(schedule) => parsed.push((job, schedule)),
                Err(source) => {
                    tracing::warn!(
                        owner = %owner,
                        job_type = %job.job_type,
                        error = %source,
                        "skipping malformed schedule"
                    );
                    report.errors.push(SchedulerError::InvalidSchedule {
                        job_type: job.job_type,
                        source,
                    });
                }
            }
        }

        // Refs held for job types that were dropped or whose key changed
        let released = self.resolver.retain(owner, &keep)?;

        {
            let mut state = self.state.lock();
            let State { table, entries } = &mut *state;
            let mut pending = HashMap::new();
            for registration in entries.remove(owner).unwrap_or_default() {
                if let Some(schedule) = table.schedule(registration.entry) {
                    pending.insert(
                        registration.job_type,
                        (
                            schedule.as_str().to_string(),
                            table.next_fire(registration.entry),
                        ),
                    );
                }
                table.remove(registration.entry);
            }

            let mut registrations = Vec::with_capacity(parsed.len());
            for (job, schedule) in parsed {
                report
                    .registered
                    .push((job.job_type, schedule.as_str().to_string()));
                // An unchanged expression keeps a fire time tick has not consumed
                let next = match pending.remove(&job.job_type) {
                    Some((expr, next)) if expr == schedule.as_str() => next,
                    _ => schedule.next_after(&now),
                };
                let entry = table.insert(
                    schedule,
                    next,
                    FireAction {
                        owner: owner.clone(),
                        job_type: job.job_type,
                        repository: declaration.repository.clone(),
                        spec: job.spec.clone(),
                        materializer: Arc::clone(&materializer),
                    },
                );
                registrations.push(Registration {
                    job_type: job.job_type,
                    entry,
                });
            }
            if !registrations.is_empty() {
                entries.insert(owner.clone(), registrations);
            }
        }

        tracing::info!(
            owner = %owner,
            registered = report.registered.len(),
            errors = report.errors.len(),
            released,
            "synced schedules"
        );
        Ok(report)
    }

    /// Drop every registration of `owner` and release its dedup refs.
    pub fn remove(&self, owner: &OwnerId) -> Result<usize, SchedulerError> {
        let removed = {
            let mut state = self.state.lock();
            let State { table, entries } = &mut *state;
            let registrations = entries.remove(owner).unwrap_or_default();
            for registration in &registrations {
                table.remove(registration.entry);
            }
            registrations.len()
        };
        self.resolver.release(owner)?;
        tracing::info!(owner = %owner, removed, "removed schedules");
        Ok(removed)
    }

    /// Fire due entries: materialize each and submit it to the queue.
    /// Returns the number of jobs submitted.
    pub fn tick(&self) -> usize {
        let now = self.clock.now();
        let fired = self.state.lock().table.fired(now);

        let mut submitted = 0;
        for (entry, action) in fired {
            let request = MaterializeRequest {
                job_type: action.job_type,
                owner: action.owner.clone(),
                repository: action.repository.clone(),
                spec: action.spec.clone(),
            };
            match action.materializer.materialize(request) {
                Ok(job) => {
                    tracing::info!(
                        owner = %action.owner,
                        job_type = %action.job_type,
                        entry = %entry,
                        "schedule fired"
                    );
                    self.queue.submit(job);
                    submitted += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        owner = %action.owner,
                        job_type = %action.job_type,
                        error = %e,
                        "failed to materialize scheduled job"
                    );
                }
            }
        }
        submitted
    }

    /// Registered job types of `owner` with their concrete expressions.
    pub fn registered(&self, owner: &OwnerId) -> Vec<(JobType, String)> {
        let state = self.state.lock();
        state
            .entries
            .get(owner)
            .into_iter()
            .flatten()
            .filter_map(|registration| {
                state
                    .table
                    .schedule(registration.entry)
                    .map(|s| (registration.job_type, s.as_str().to_string()))
            })
            .collect()
    }

    pub fn owners(&self) -> Vec<OwnerId> {
        self.state.lock().entries.keys().cloned().collect()
    }

    /// Total cron entries across owners.
    pub fn entry_count(&self) -> usize {
        self.state.lock().table.len()
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.state.lock().table.next_deadline()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
