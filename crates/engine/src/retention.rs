// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History retention: which finished job records to delete.
//!
//! Successful and failed jobs are trimmed independently. Each group keeps
//! its newest `limit` records, where the limit is the explicit per-outcome
//! value, else the deprecated `keep_jobs`, else unbounded. Running jobs are
//! never candidates.

use ks_core::{JobRecord, RetentionLimits, TerminalCondition};

/// Records to delete, oldest first: failed candidates, then successful.
pub fn select_for_deletion(jobs: &[JobRecord], limits: &RetentionLimits) -> Vec<JobRecord> {
    let mut failed = finished(jobs, TerminalCondition::Failed);
    let mut successful = finished(jobs, TerminalCondition::Succeeded);
    sort_oldest_first(&mut failed);
    sort_oldest_first(&mut successful);

    let mut selected = excess(failed, limits.failed_limit());
    selected.extend(excess(successful, limits.successful_limit()));
    selected
}

fn finished(jobs: &[JobRecord], condition: TerminalCondition) -> Vec<&JobRecord> {
    jobs.iter()
        .filter(|job| job.condition == Some(condition))
        .collect()
}

fn sort_oldest_first(jobs: &mut [&JobRecord]) {
    jobs.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.name().cmp(b.id.name()))
    });
}

/// Everything but the newest `limit` entries of an oldest-first list.
fn excess(sorted: Vec<&JobRecord>, limit: Option<usize>) -> Vec<JobRecord> {
    let Some(limit) = limit else {
        return Vec::new();
    };
    let cut = sorted.len().saturating_sub(limit);
    sorted.into_iter().take(cut).cloned().collect()
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
