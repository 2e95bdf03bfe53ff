// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable schedule store backed by a JSON snapshot file

use crate::snapshot::ScheduleSnapshot;
use crate::table::ScheduleTable;
use crate::{ScheduleStore, SnapshotError, StoreError};
use ks_core::{EffectiveSchedule, ScheduleId};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write-through store: every successful mutation rewrites the snapshot
/// before returning, so generated schedules survive restarts.
///
/// The table lock is held across the write, which serializes writers within
/// one process. Version checks still catch writers that read before the
/// lock was taken.
pub struct FileScheduleStore {
    path: PathBuf,
    table: Mutex<ScheduleTable>,
}

impl FileScheduleStore {
    /// Open the store at `path`, loading any existing snapshot.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let path = path.into();
        let table = match ScheduleSnapshot::load(&path)? {
            Some(snapshot) => {
                debug!(
                    path = %path.display(),
                    records = snapshot.record_count(),
                    "loaded effective schedules"
                );
                snapshot.table
            }
            None => ScheduleTable::default(),
        };
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `op` to a copy of the table and persist it; the in-memory table
    /// only changes if the write succeeds.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut ScheduleTable) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut table = self.table.lock();
        let mut next = table.clone();
        let out = op(&mut next)?;
        ScheduleSnapshot::new(next.clone()).save(&self.path)?;
        *table = next;
        Ok(out)
    }
}

impl ScheduleStore for FileScheduleStore {
    fn list(&self, namespace: &str) -> Result<Vec<EffectiveSchedule>, StoreError> {
        Ok(self.table.lock().list(namespace))
    }

    fn create(
        &self,
        namespace: &str,
        record: EffectiveSchedule,
    ) -> Result<EffectiveSchedule, StoreError> {
        self.mutate(|table| table.create(namespace, record))
    }

    fn update(
        &self,
        namespace: &str,
        record: EffectiveSchedule,
    ) -> Result<EffectiveSchedule, StoreError> {
        self.mutate(|table| table.update(namespace, record))
    }

    fn delete(&self, namespace: &str, id: &ScheduleId, version: u64) -> Result<(), StoreError> {
        self.mutate(|table| table.delete(namespace, id, version))
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
