// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ks-core: data model shared by the Keepsake scheduler, admission queue,
//! observer and retention engine.

pub mod clock;
pub mod effective_schedule;
pub mod event;
pub mod id;
pub mod job;
pub mod namespace;
pub mod retention;
pub mod schedule;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use effective_schedule::EffectiveSchedule;
pub use event::{JobEvent, JobEventKind};
pub use id::{IdGen, JobId, RepositoryId, ScheduleId, SequentialIdGen, UuidIdGen};
pub use job::{
    JobClassification, JobRecord, JobSpec, JobType, ParseJobTypeError, TerminalCondition,
};
pub use namespace::{scoped_name, split_scoped_name, Namespace, OwnerId};
pub use retention::RetentionLimits;
pub use schedule::{RandomSchedule, ScheduleDefinition, ScheduleKey};
