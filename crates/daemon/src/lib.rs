// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keepsake daemon library
//!
//! Configuration, lifecycle, declaration loading, the subprocess execution
//! sink and job history. The `ksd` binary wires them to the engine.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod daemon;
pub mod declarations;
pub mod env;
pub mod history;
pub mod launcher;
pub mod lifecycle;

pub use config::{Config, ConfigError, SCHEDULER_TICK};
pub use daemon::{ActivityReport, Daemon, ResyncReport};
pub use declarations::{
    parse_declarations, DeclarationError, DeclarationSource, DeclaredSchedule, FileDeclarations,
};
pub use history::JobHistory;
pub use launcher::CommandLauncher;
pub use lifecycle::{DaemonState, LifecycleError};
