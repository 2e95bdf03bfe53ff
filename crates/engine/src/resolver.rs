// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule deduplication.
//!
//! Every owner whose declaration has the same [`ScheduleKey`] converges on one
//! persisted [`EffectiveSchedule`]. The first owner to miss generates the
//! concrete expression; later owners append themselves to its refs. Records
//! are written read-modify-write against the store's version check, and
//! conflicting writes are retried from a fresh read.

use crate::randomizer::Randomizer;
use ks_core::{EffectiveSchedule, JobType, OwnerId, ScheduleDefinition, ScheduleId, ScheduleKey};
use ks_storage::{ScheduleStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Bound on read-modify-write attempts for one record
const MAX_ATTEMPTS: usize = 16;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("schedule store error: {0}")]
    Store(#[from] StoreError),
    #[error("gave up on {id} after {attempts} conflicting writes")]
    Contention { id: ScheduleId, attempts: usize },
}

pub struct ScheduleResolver {
    store: Arc<dyn ScheduleStore>,
    namespace: String,
    randomizer: Randomizer,
}

impl ScheduleResolver {
    /// Resolver over records kept in the administrative `namespace`.
    pub fn new(store: Arc<dyn ScheduleStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            randomizer: Randomizer::new(),
        }
    }

    pub fn with_randomizer(mut self, randomizer: Randomizer) -> Self {
        self.randomizer = randomizer;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Concrete expression for `key`, registering `owner` as a ref when the
    /// declaration is randomized. Concrete declarations pass through.
    pub fn resolve(&self, owner: &OwnerId, key: &ScheduleKey) -> Result<String, ResolveError> {
        let ScheduleDefinition::Random(class) = key.original else {
            return Ok(key.original.as_str().to_string());
        };

        for _ in 0..MAX_ATTEMPTS {
            match self.find(|record| &record.key == key)? {
                Some(mut record) => {
                    if !record.add_ref(owner.clone()) {
                        return Ok(record.generated_schedule);
                    }
                    let generated = record.generated_schedule.clone();
                    match self.store.update(&self.namespace, record) {
                        Ok(_) => {
                            tracing::debug!(
                                owner = %owner,
                                key = %key.record_id(),
                                schedule = %generated,
                                "joined effective schedule"
                            );
                            return Ok(generated);
                        }
                        // Deleted under us: next pass creates it again
                        Err(StoreError::NotFound(_)) => continue,
                        Err(e) if e.is_retryable() => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
                None => {
                    let generated = self.randomizer.generate(class);
                    let record = EffectiveSchedule::new(key.clone(), generated.clone(), owner.clone());
                    match self.store.create(&self.namespace, record) {
                        Ok(_) => {
                            tracing::info!(
                                owner = %owner,
                                key = %key.record_id(),
                                schedule = %generated,
                                "generated effective schedule"
                            );
                            return Ok(generated);
                        }
                        // Lost the create race: next pass joins the winner
                        Err(e) if e.is_retryable() => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        Err(ResolveError::Contention {
            id: key.record_id(),
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Drop `owner` from records of `job_type` that no longer match its
    /// declaration. `current` is the owner's key for that job type, or
    /// `None` if the job type was removed or is now concrete.
    ///
    /// Returns the number of records the owner was removed from.
    pub fn cleanup(
        &self,
        owner: &OwnerId,
        job_type: JobType,
        current: Option<&ScheduleKey>,
    ) -> Result<usize, ResolveError> {
        self.detach(owner, |key| key.job_type == job_type && Some(key) != current)
    }

    /// Drop `owner` from every record whose key is not in `keep`.
    pub fn retain(&self, owner: &OwnerId, keep: &[ScheduleKey]) -> Result<usize, ResolveError> {
        self.detach(owner, |key| !keep.contains(key))
    }

    /// Drop `owner` from every record.
    pub fn release(&self, owner: &OwnerId) -> Result<usize, ResolveError> {
        self.detach(owner, |_| true)
    }

    /// Records currently referencing `owner`.
    pub fn records_for(&self, owner: &OwnerId) -> Result<Vec<EffectiveSchedule>, ResolveError> {
        let records = self.store.list(&self.namespace)?;
        Ok(records
            .into_iter()
            .filter(|record| record.is_referenced_by(owner))
            .collect())
    }

    fn detach(
        &self,
        owner: &OwnerId,
        stale: impl Fn(&ScheduleKey) -> bool,
    ) -> Result<usize, ResolveError> {
        let ids: Vec<ScheduleId> = self
            .records_for(owner)?
            .into_iter()
            .filter(|record| stale(&record.key))
            .map(|record| record.id)
            .collect();

        let mut removed = 0;
        for id in ids {
            if self.remove_ref(owner, &id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove one ref, deleting the record if it was the last.
    fn remove_ref(&self, owner: &OwnerId, id: &ScheduleId) -> Result<bool, ResolveError> {
        for _ in 0..MAX_ATTEMPTS {
            let Some(mut record) = self.find(|record| &record.id == id)? else {
                return Ok(false);
            };
            if !record.remove_ref(owner) {
                return Ok(false);
            }

            let result = if record.is_orphaned() {
                self.store.delete(&self.namespace, id, record.version)
            } else {
                self.store.update(&self.namespace, record.clone()).map(|_| ())
            };
            match result {
                Ok(()) => {
                    if record.is_orphaned() {
                        tracing::info!(owner = %owner, key = %id, "deleted orphaned effective schedule");
                    } else {
                        tracing::debug!(owner = %owner, key = %id, "left effective schedule");
                    }
                    return Ok(true);
                }
                Err(StoreError::NotFound(_)) => return Ok(false),
                Err(e) if e.is_retryable() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(ResolveError::Contention {
            id: id.clone(),
            attempts: MAX_ATTEMPTS,
        })
    }

    fn find(
        &self,
        matches: impl Fn(&EffectiveSchedule) -> bool,
    ) -> Result<Option<EffectiveSchedule>, ResolveError> {
        let records = self.store.list(&self.namespace)?;
        Ok(records.into_iter().find(|record| matches(record)))
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
