// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted record of a generated schedule and the owners sharing it.

use crate::id::ScheduleId;
use crate::namespace::OwnerId;
use crate::schedule::ScheduleKey;
use serde::{Deserialize, Serialize};

/// A concrete cron expression shared by every owner whose declaration has
/// the same [`ScheduleKey`].
///
/// `generated_schedule` is frozen at creation and never rewritten. The record
/// is deleted once `schedule_refs` becomes empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveSchedule {
    pub id: ScheduleId,
    /// Optimistic-concurrency token, bumped by the store on every write
    #[serde(default)]
    pub version: u64,
    pub key: ScheduleKey,
    pub generated_schedule: String,
    #[serde(default)]
    pub schedule_refs: Vec<OwnerId>,
}

impl EffectiveSchedule {
    /// New record with `owner` as its only ref.
    pub fn new(key: ScheduleKey, generated_schedule: impl Into<String>, owner: OwnerId) -> Self {
        Self {
            id: key.record_id(),
            version: 0,
            key,
            generated_schedule: generated_schedule.into(),
            schedule_refs: vec![owner],
        }
    }

    pub fn is_referenced_by(&self, owner: &OwnerId) -> bool {
        self.schedule_refs.contains(owner)
    }

    /// Append `owner` unless already present. Returns true if it was added.
    pub fn add_ref(&mut self, owner: OwnerId) -> bool {
        if self.is_referenced_by(&owner) {
            return false;
        }
        self.schedule_refs.push(owner);
        true
    }

    /// Returns true if `owner` was present.
    pub fn remove_ref(&mut self, owner: &OwnerId) -> bool {
        let before = self.schedule_refs.len();
        self.schedule_refs.retain(|r| r != owner);
        self.schedule_refs.len() != before
    }

    pub fn is_orphaned(&self) -> bool {
        self.schedule_refs.is_empty()
    }
}

#[cfg(test)]
#[path = "effective_schedule_tests.rs"]
mod tests;
