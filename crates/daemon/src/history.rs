// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Finished-job history and its retention.
//!
//! Every launched job is recorded here. When the observer reports it
//! finished, the owner's history is trimmed with
//! [`select_for_deletion`] and each pruned job gets a `Delete` event so the
//! observer forgets it too.

use std::collections::HashMap;
use std::sync::Arc;

use ks_core::{
    JobClassification, JobEvent, JobEventKind, JobId, JobRecord, OwnerId, RepositoryId,
    RetentionLimits, TerminalCondition,
};
use ks_engine::{select_for_deletion, CallbackError, ObservableJob, Observer};
use parking_lot::Mutex;

struct Entry {
    record: JobRecord,
    repository: RepositoryId,
    exclusive: bool,
}

#[derive(Default)]
struct State {
    jobs: HashMap<OwnerId, Vec<Entry>>,
    limits: HashMap<OwnerId, RetentionLimits>,
}

pub struct JobHistory {
    observer: Arc<Observer>,
    /// Operator-wide limits for owners that leave theirs unset
    defaults: RetentionLimits,
    state: Mutex<State>,
}

impl JobHistory {
    pub fn new(observer: Arc<Observer>, defaults: RetentionLimits) -> Self {
        Self {
            observer,
            defaults,
            state: Mutex::new(State::default()),
        }
    }

    pub fn set_limits(&self, owner: &OwnerId, limits: RetentionLimits) {
        self.state.lock().limits.insert(owner.clone(), limits);
    }

    /// Limits applied to `owner`, with operator defaults filled in.
    pub fn limits(&self, owner: &OwnerId) -> RetentionLimits {
        self.state
            .lock()
            .limits
            .get(owner)
            .copied()
            .unwrap_or_default()
            .with_defaults(&self.defaults)
    }

    pub fn record_started(&self, record: JobRecord, repository: RepositoryId, exclusive: bool) {
        let mut state = self.state.lock();
        state.jobs.entry(record.owner.clone()).or_default().push(Entry {
            record,
            repository,
            exclusive,
        });
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.state
            .lock()
            .jobs
            .values()
            .flatten()
            .any(|entry| &entry.record.id == id)
    }

    /// Records of `owner`, oldest first.
    pub fn records(&self, owner: &OwnerId) -> Vec<JobRecord> {
        let state = self.state.lock();
        let mut records: Vec<JobRecord> = state
            .jobs
            .get(owner)
            .into_iter()
            .flatten()
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }

    /// Mark a job finished and trim its owner's history.
    ///
    /// Returns the records that were pruned.
    pub fn record_finished(&self, id: &JobId, condition: TerminalCondition) -> Vec<JobRecord> {
        let (doomed, events) = {
            let mut state = self.state.lock();
            let State { jobs, limits } = &mut *state;
            let Some((owner, entries)) = jobs
                .iter_mut()
                .find(|(_, entries)| entries.iter().any(|e| &e.record.id == id))
            else {
                tracing::debug!(job_id = %id, "finished job has no history record");
                return Vec::new();
            };
            for entry in entries.iter_mut().filter(|e| &e.record.id == id) {
                entry.record.condition = Some(condition);
            }

            let owner_limits = limits
                .get(owner)
                .copied()
                .unwrap_or_default()
                .with_defaults(&self.defaults);
            let records: Vec<JobRecord> = entries.iter().map(|e| e.record.clone()).collect();
            let doomed = select_for_deletion(&records, &owner_limits);

            let mut events = Vec::with_capacity(doomed.len());
            entries.retain(|entry| {
                if doomed.iter().any(|d| d.id == entry.record.id) {
                    events.push(JobEvent::new(
                        entry.record.id.clone(),
                        JobEventKind::Delete,
                        entry.repository.clone(),
                        entry.record.job_type,
                        entry.exclusive,
                    ));
                    false
                } else {
                    true
                }
            });
            (doomed, events)
        };

        for event in events {
            tracing::info!(job_id = %event.id, "pruning job history");
            self.observer.publish(event);
        }
        doomed
    }

    /// Forget a job that was deleted downstream.
    pub fn forget(&self, id: &JobId) {
        let mut state = self.state.lock();
        for entries in state.jobs.values_mut() {
            entries.retain(|entry| &entry.record.id != id);
        }
        state.jobs.retain(|_, entries| !entries.is_empty());
    }

    /// Drop everything known about an owner that is no longer declared.
    pub fn remove_owner(&self, owner: &OwnerId) {
        let mut state = self.state.lock();
        state.limits.remove(owner);
        state.jobs.remove(owner);
    }

    /// Observer callback body for a launched job.
    pub fn on_terminal(&self, job: &ObservableJob) -> Result<(), CallbackError> {
        match job.classification {
            Some(JobClassification::Succeeded) => {
                self.record_finished(&job.id, TerminalCondition::Succeeded);
            }
            Some(JobClassification::Failed) => {
                self.record_finished(&job.id, TerminalCondition::Failed);
            }
            Some(JobClassification::Deleted) => self.forget(&job.id),
            Some(JobClassification::Running) | None => {
                return Err(CallbackError::Failed(format!(
                    "{} reported terminal without a terminal state",
                    job.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
