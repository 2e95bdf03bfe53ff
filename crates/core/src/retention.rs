// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History limits for finished jobs.

use serde::{Deserialize, Serialize};

/// How many finished jobs to keep per outcome.
///
/// `None` means unbounded. `keep_jobs` is the deprecated single limit that
/// applies to both outcomes when the specific limit is unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionLimits {
    #[serde(default, alias = "successful_jobs_history_limit")]
    pub successful: Option<usize>,
    #[serde(default, alias = "failed_jobs_history_limit")]
    pub failed: Option<usize>,
    #[serde(default)]
    pub keep_jobs: Option<usize>,
}

impl RetentionLimits {
    pub fn new(successful: Option<usize>, failed: Option<usize>) -> Self {
        Self {
            successful,
            failed,
            keep_jobs: None,
        }
    }

    /// Only the deprecated single limit.
    pub fn keep_jobs(n: usize) -> Self {
        Self {
            keep_jobs: Some(n),
            ..Self::default()
        }
    }

    /// Effective limit for successful jobs.
    pub fn successful_limit(&self) -> Option<usize> {
        self.successful.or(self.keep_jobs)
    }

    /// Effective limit for failed jobs.
    pub fn failed_limit(&self) -> Option<usize> {
        self.failed.or(self.keep_jobs)
    }

    /// Fill every unset field from `defaults` (e.g. operator-wide limits).
    pub fn with_defaults(self, defaults: &RetentionLimits) -> Self {
        Self {
            successful: self.successful.or(defaults.successful),
            failed: self.failed.or(defaults.failed),
            keep_jobs: self.keep_jobs.or(defaults.keep_jobs),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.successful_limit().is_none() && self.failed_limit().is_none()
    }
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
