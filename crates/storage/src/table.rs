// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned in-memory table shared by the memory and file stores

use crate::StoreError;
use ks_core::{EffectiveSchedule, ScheduleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct ScheduleTable {
    #[serde(default)]
    pub namespaces: BTreeMap<String, BTreeMap<ScheduleId, EffectiveSchedule>>,
}

impl ScheduleTable {
    pub fn list(&self, namespace: &str) -> Vec<EffectiveSchedule> {
        self.namespaces
            .get(namespace)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn create(
        &mut self,
        namespace: &str,
        mut record: EffectiveSchedule,
    ) -> Result<EffectiveSchedule, StoreError> {
        let records = self.namespaces.entry(namespace.to_string()).or_default();
        if records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        record.version = 1;
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    pub fn update(
        &mut self,
        namespace: &str,
        mut record: EffectiveSchedule,
    ) -> Result<EffectiveSchedule, StoreError> {
        let stored = self
            .namespaces
            .get_mut(namespace)
            .and_then(|records| records.get_mut(&record.id))
            .ok_or_else(|| StoreError::NotFound(record.id.clone()))?;
        if stored.version != record.version {
            return Err(StoreError::Conflict {
                id: record.id,
                expected: record.version,
                actual: stored.version,
            });
        }
        record.version += 1;
        *stored = record.clone();
        Ok(record)
    }

    pub fn delete(
        &mut self,
        namespace: &str,
        id: &ScheduleId,
        version: u64,
    ) -> Result<(), StoreError> {
        let records = self
            .namespaces
            .get_mut(namespace)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let stored = records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if stored.version != version {
            return Err(StoreError::Conflict {
                id: id.clone(),
                expected: version,
                actual: stored.version,
            });
        }
        records.remove(id);
        if records.is_empty() {
            self.namespaces.remove(namespace);
        }
        Ok(())
    }
}
