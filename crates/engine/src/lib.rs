// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Keepsake coordination engine: dedup resolution, cron scheduling,
//! per-repository admission, job observation and history retention.

mod cron;
mod error;
mod job;
mod observer;
mod queue;
mod randomizer;
mod resolver;
pub mod retention;
mod scheduler;

#[cfg(test)]
mod test_helpers;

pub use cron::{CronError, CronSchedule, CronTable, EntryId};
pub use error::{CallbackError, ExecuteError};
pub use job::{
    build_job, ArchiveJob, BackupJob, CheckJob, DomainJob, JobBase, JobDescription, JobMaterializer,
    KindMaterializer, LaunchRequest, Launcher, MaterializeRequest, PruneJob, RestoreJob,
};
pub use observer::{
    Callback, EventLoop, NamespaceCounters, ObservableJob, Observer, ObserverStats,
};
pub use queue::{spawn_dispatcher, AdmissionQueue, ConcurrencyLimits, DispatchReport};
pub use randomizer::Randomizer;
pub use resolver::{ResolveError, ScheduleResolver};
pub use retention::select_for_deletion;
pub use scheduler::{Declaration, ScheduledJob, Scheduler, SchedulerError, SyncReport};
