// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage contract for effective schedules

use ks_core::{EffectiveSchedule, ScheduleId};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur in schedule store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record changed since it was read. Re-read and retry.
    #[error("conflict on {id}: expected version {expected}, found {actual}")]
    Conflict {
        id: ScheduleId,
        expected: u64,
        actual: u64,
    },
    #[error("record already exists: {0}")]
    AlreadyExists(ScheduleId),
    #[error("record not found: {0}")]
    NotFound(ScheduleId),
    #[error("persistence failed: {0}")]
    Persist(#[from] crate::SnapshotError),
}

impl StoreError {
    /// Conflicts and lost create races are resolved by re-reading.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. } | StoreError::AlreadyExists(_))
    }
}

/// List/create/update/delete of effective schedules within one namespace.
///
/// Implementations bump `version` on every successful write and return the
/// stored record.
pub trait ScheduleStore: Send + Sync {
    fn list(&self, namespace: &str) -> Result<Vec<EffectiveSchedule>, StoreError>;

    /// Fails with `AlreadyExists` if a record with the same id is stored.
    fn create(
        &self,
        namespace: &str,
        record: EffectiveSchedule,
    ) -> Result<EffectiveSchedule, StoreError>;

    /// Fails with `Conflict` unless `record.version` matches the stored version.
    fn update(
        &self,
        namespace: &str,
        record: EffectiveSchedule,
    ) -> Result<EffectiveSchedule, StoreError>;

    /// Fails with `Conflict` unless `version` matches the stored version.
    fn delete(&self, namespace: &str, id: &ScheduleId, version: u64) -> Result<(), StoreError>;
}

impl<T: ScheduleStore + ?Sized> ScheduleStore for Arc<T> {
    fn list(&self, namespace: &str) -> Result<Vec<EffectiveSchedule>, StoreError> {
        (**self).list(namespace)
    }

    fn create(
        &self,
        namespace: &str,
        record: EffectiveSchedule,
    ) -> Result<EffectiveSchedule, StoreError> {
        (**self).create(namespace, record)
    }

    fn update(
        &self,
        namespace: &str,
        record: EffectiveSchedule,
    ) -> Result<EffectiveSchedule, StoreError> {
        (**self).update(namespace, record)
    }

    fn delete(&self, namespace: &str, id: &ScheduleId, version: u64) -> Result<(), StoreError> {
        (**self).delete(namespace, id, version)
    }
}
