// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-local schedule store

use crate::table::ScheduleTable;
use crate::{ScheduleStore, StoreError};
use ks_core::{EffectiveSchedule, ScheduleId};
use parking_lot::Mutex;

/// In-memory store. Records are lost on restart; use
/// [`FileScheduleStore`](crate::FileScheduleStore) when they must survive.
#[derive(Default)]
pub struct MemoryScheduleStore {
    table: Mutex<ScheduleTable>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScheduleStore for MemoryScheduleStore {
    fn list(&self, namespace: &str) -> Result<Vec<EffectiveSchedule>, StoreError> {
        Ok(self.table.lock().list(namespace))
    }

    fn create(
        &self,
        namespace: &str,
        record: EffectiveSchedule,
    ) -> Result<EffectiveSchedule, StoreError> {
        self.table.lock().create(namespace, record)
    }

    fn update(
        &self,
        namespace: &str,
        record: EffectiveSchedule,
    ) -> Result<EffectiveSchedule, StoreError> {
        self.table.lock().update(namespace, record)
    }

    fn delete(&self, namespace: &str, id: &ScheduleId, version: u64) -> Result<(), StoreError> {
        self.table.lock().delete(namespace, id, version)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
