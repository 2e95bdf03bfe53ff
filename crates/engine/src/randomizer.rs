// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generation of concrete cron expressions for `@x-random` declarations.
//!
//! | class   | expression       | ranges                              |
//! |---------|------------------|-------------------------------------|
//! | hourly  | `M * * * *`      | M 0..=59                            |
//! | daily   | `M H * * *`      | H 0..=23                            |
//! | weekly  | `M H * * D`      | D 0..=6, Sunday = 0                 |
//! | monthly | `M H DOM * *`    | DOM 1..=27, so every month fires    |
//! | yearly  | `M H DOM MON *`  | MON 1..=12                          |
//!
//! Values are drawn once and frozen in the effective schedule record.

use ks_core::RandomSchedule;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct Randomizer {
    rng: Mutex<StdRng>,
}

impl Randomizer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic sequence for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn generate(&self, class: RandomSchedule) -> String {
        let mut rng = self.rng.lock();
        let minute = rng.random_range(0..60u32);
        let hour = rng.random_range(0..24u32);
        match class {
            RandomSchedule::Hourly => format!("{minute} * * * *"),
            RandomSchedule::Daily => format!("{minute} {hour} * * *"),
            RandomSchedule::Weekly => {
                let weekday = rng.random_range(0..7u32);
                format!("{minute} {hour} * * {weekday}")
            }
            RandomSchedule::Monthly => {
                let day = rng.random_range(1..28u32);
                format!("{minute} {hour} {day} * *")
            }
            RandomSchedule::Yearly => {
                let day = rng.random_range(1..28u32);
                let month = rng.random_range(1..13u32);
                format!("{minute} {hour} {day} {month} *")
            }
        }
    }
}

impl Default for Randomizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "randomizer_tests.rs"]
mod tests;
