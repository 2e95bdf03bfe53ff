// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declaration reconciliation and the scheduler tick.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use ks_core::{Clock, JobType, OwnerId};
use ks_engine::{AdmissionQueue, JobMaterializer, NamespaceCounters, Observer, Scheduler};
use parking_lot::Mutex;

use crate::declarations::{DeclarationError, DeclarationSource};
use crate::history::JobHistory;
use crate::launcher::CommandLauncher;

/// Outcome of one resync
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResyncReport {
    pub synced: usize,
    /// Owners synced with at least one malformed schedule
    pub degraded: usize,
    /// Owners whose sync failed; their previous registrations stay
    pub failed: usize,
    pub removed: usize,
}

/// Queue depth and job outcome counters, logged periodically
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActivityReport {
    /// Jobs waiting for admission per (namespace, job type)
    pub queued: BTreeMap<(String, JobType), usize>,
    /// Outcomes per namespace since startup
    pub outcomes: BTreeMap<String, NamespaceCounters>,
}

impl ActivityReport {
    pub fn collect(queue: &AdmissionQueue, observer: &Observer) -> Self {
        Self {
            queued: queue.queued_by_type(),
            outcomes: observer.stats().namespaces,
        }
    }

    pub fn log(&self) {
        for ((namespace, job_type), depth) in &self.queued {
            tracing::info!(
                namespace = %namespace,
                job_type = %job_type,
                depth,
                "jobs queued"
            );
        }
        for (namespace, counters) in &self.outcomes {
            tracing::info!(
                namespace = %namespace,
                succeeded = counters.succeeded,
                failed = counters.failed,
                total = counters.total,
                "job outcomes"
            );
        }
    }
}

pub struct Daemon<C: Clock> {
    scheduler: Arc<Scheduler<C>>,
    materializer: Arc<dyn JobMaterializer>,
    launcher: Arc<CommandLauncher<C>>,
    history: Arc<JobHistory>,
    source: Box<dyn DeclarationSource>,
    /// Owners declared at the last successful load
    known: Mutex<HashSet<OwnerId>>,
}

impl<C: Clock> Daemon<C> {
    pub fn new(
        scheduler: Arc<Scheduler<C>>,
        materializer: Arc<dyn JobMaterializer>,
        launcher: Arc<CommandLauncher<C>>,
        history: Arc<JobHistory>,
        source: Box<dyn DeclarationSource>,
    ) -> Self {
        Self {
            scheduler,
            materializer,
            launcher,
            history,
            source,
            known: Mutex::new(HashSet::new()),
        }
    }

    /// Sync every declared owner and remove owners that disappeared.
    ///
    /// A declaration source error leaves every registration untouched.
    pub async fn resync(&self) -> Result<ResyncReport, DeclarationError> {
        let declared = self.source.load().await?;
        let mut report = ResyncReport::default();
        let mut current = HashSet::with_capacity(declared.len());

        for decl in &declared {
            let owner = decl.owner();
            current.insert(owner.clone());
            self.launcher.set_commands(owner, decl.commands.clone());
            self.history.set_limits(owner, decl.history);

            match self
                .scheduler
                .sync(&decl.declaration, Arc::clone(&self.materializer))
            {
                Ok(sync) if sync.is_clean() => report.synced += 1,
                Ok(_) => {
                    report.synced += 1;
                    report.degraded += 1;
                }
                Err(e) => {
                    tracing::error!(owner = %owner, error = %e, "failed to sync schedules");
                    report.failed += 1;
                }
            }
        }

        let vanished: Vec<OwnerId> = {
            let known = self.known.lock();
            known
                .iter()
                .cloned()
                .chain(self.scheduler.owners())
                .filter(|owner| !current.contains(owner))
                .collect::<HashSet<_>>()
                .into_iter()
                .collect()
        };
        for owner in vanished {
            match self.scheduler.remove(&owner) {
                Ok(_) => {
                    self.launcher.remove_owner(&owner);
                    self.history.remove_owner(&owner);
                    report.removed += 1;
                }
                Err(e) => {
                    // Retried on the next resync
                    tracing::error!(owner = %owner, error = %e, "failed to remove schedules");
                    current.insert(owner);
                }
            }
        }

        *self.known.lock() = current;
        tracing::info!(
            synced = report.synced,
            degraded = report.degraded,
            failed = report.failed,
            removed = report.removed,
            "resynced declarations"
        );
        Ok(report)
    }

    /// Fire due cron entries. Returns the number of jobs queued.
    pub fn tick(&self) -> usize {
        self.scheduler.tick()
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
