// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn fake_clock_starts_at_new_year() {
    let clock = FakeClock::new();
    assert_eq!(
        clock.now(),
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    );
}

#[test]
fn fake_clock_advance_is_shared_between_clones() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_secs(90));
    assert_eq!(
        other.now(),
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 30).unwrap()
    );
}

#[test]
fn fake_clock_set() {
    let clock = FakeClock::new();
    let target = Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap();
    clock.set(target);
    assert_eq!(clock.now(), target);
}
