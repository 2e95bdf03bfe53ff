// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence for effective schedule records.
//!
//! Records are scoped to one administrative namespace and written with
//! optimistic concurrency: every write names the version it read, and a
//! stale write fails with [`StoreError::Conflict`].

mod file;
mod memory;
mod snapshot;
mod store;
mod table;

pub use file::FileScheduleStore;
pub use memory::MemoryScheduleStore;
pub use snapshot::{ScheduleSnapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use store::{ScheduleStore, StoreError};
