// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::JobType;

fn record() -> EffectiveSchedule {
    let key = ScheduleKey::new(JobType::Backup, "s3:bucket", "@daily-random");
    EffectiveSchedule::new(key, "17 3 * * *", OwnerId::new("ns", "a"))
}

#[test]
fn new_record_has_single_ref_and_key_derived_id() {
    let r = record();
    assert_eq!(r.id, r.key.record_id());
    assert_eq!(r.schedule_refs, vec![OwnerId::new("ns", "a")]);
    assert_eq!(r.version, 0);
}

#[test]
fn add_ref_is_idempotent_and_preserves_order() {
    let mut r = record();
    assert!(r.add_ref(OwnerId::new("ns", "b")));
    assert!(!r.add_ref(OwnerId::new("ns", "a")));
    assert!(r.add_ref(OwnerId::new("other", "a")));
    assert_eq!(
        r.schedule_refs,
        vec![
            OwnerId::new("ns", "a"),
            OwnerId::new("ns", "b"),
            OwnerId::new("other", "a"),
        ]
    );
}

#[test]
fn removing_non_last_ref_keeps_generated_schedule() {
    let mut r = record();
    r.add_ref(OwnerId::new("ns", "b"));
    assert!(r.remove_ref(&OwnerId::new("ns", "a")));
    assert!(!r.is_orphaned());
    assert_eq!(r.generated_schedule, "17 3 * * *");
}

#[test]
fn removing_last_ref_orphans_record() {
    let mut r = record();
    assert!(r.remove_ref(&OwnerId::new("ns", "a")));
    assert!(r.is_orphaned());
    assert!(!r.remove_ref(&OwnerId::new("ns", "a")));
}

#[test]
fn serde_keeps_refs_as_scoped_strings() {
    let r = record();
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["schedule_refs"][0], "ns/a");
    assert_eq!(json["key"]["original"], "@daily-random");
    let back: EffectiveSchedule = serde_json::from_value(json).unwrap();
    assert_eq!(back, r);
}
