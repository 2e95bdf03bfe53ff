// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule declarations and the dedup key.
//!
//! A declaration is either a concrete cron expression or one of the
//! `@x-random` sentinels. Sentinels are translated once into a concrete
//! expression and shared by every declaration with the same key.

use crate::id::{RepositoryId, ScheduleId};
use crate::job::JobType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Randomization class of a `@x-random` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RandomSchedule {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RandomSchedule {
    pub fn sentinel(self) -> &'static str {
        match self {
            RandomSchedule::Hourly => "@hourly-random",
            RandomSchedule::Daily => "@daily-random",
            RandomSchedule::Weekly => "@weekly-random",
            RandomSchedule::Monthly => "@monthly-random",
            RandomSchedule::Yearly => "@yearly-random",
        }
    }

    fn from_sentinel(s: &str) -> Option<Self> {
        match s {
            "@hourly-random" => Some(RandomSchedule::Hourly),
            "@daily-random" => Some(RandomSchedule::Daily),
            "@weekly-random" => Some(RandomSchedule::Weekly),
            "@monthly-random" => Some(RandomSchedule::Monthly),
            "@yearly-random" | "@annually-random" => Some(RandomSchedule::Yearly),
            _ => None,
        }
    }
}

/// A schedule as written in a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleDefinition {
    /// Cron expression or cron macro, used as-is
    Concrete(String),
    /// Randomized sentinel, resolved through the dedup resolver
    Random(RandomSchedule),
}

impl ScheduleDefinition {
    /// Parse a declaration string. Anything that isn't a known sentinel is
    /// treated as concrete; validation happens when the cron entry is
    /// registered.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match RandomSchedule::from_sentinel(&trimmed.to_ascii_lowercase()) {
            Some(random) => ScheduleDefinition::Random(random),
            None => ScheduleDefinition::Concrete(trimmed.to_string()),
        }
    }

    pub fn is_random(&self) -> bool {
        matches!(self, ScheduleDefinition::Random(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ScheduleDefinition::Concrete(expr) => expr,
            ScheduleDefinition::Random(random) => random.sentinel(),
        }
    }
}

impl fmt::Display for ScheduleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ScheduleDefinition {
    fn from(s: &str) -> Self {
        ScheduleDefinition::parse(s)
    }
}

impl Serialize for ScheduleDefinition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScheduleDefinition {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ScheduleDefinition::parse(&s))
    }
}

/// Dedup key: every declaration with an identical key converges on the same
/// generated schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleKey {
    pub job_type: JobType,
    pub repository: RepositoryId,
    pub original: ScheduleDefinition,
}

impl ScheduleKey {
    pub fn new(
        job_type: JobType,
        repository: impl Into<RepositoryId>,
        original: impl Into<ScheduleDefinition>,
    ) -> Self {
        Self {
            job_type,
            repository: repository.into(),
            original: original.into(),
        }
    }

    /// Deterministic record id for this key.
    ///
    /// Two processes that miss the same key at the same time derive the same
    /// id, so only one create can win.
    pub fn record_id(&self) -> ScheduleId {
        ScheduleId::new(format!(
            "{}|{}|{}",
            self.job_type, self.original, self.repository
        ))
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
