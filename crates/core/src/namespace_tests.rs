// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn namespace_new_and_deref() {
    let ns = Namespace::new("tenant-a");
    assert_eq!(&*ns, "tenant-a");
    assert!(!ns.is_empty());
}

#[test]
fn namespace_default_is_empty() {
    assert!(Namespace::default().is_empty());
}

#[yare::parameterized(
    scoped   = { "tenant-a", "nightly", "tenant-a/nightly" },
    unscoped = { "",         "nightly", "nightly" },
)]
fn scoped_name_formats(ns: &str, name: &str, expected: &str) {
    assert_eq!(scoped_name(ns, name), expected);
}

#[yare::parameterized(
    scoped   = { "tenant-a/nightly", "tenant-a", "nightly" },
    bare     = { "nightly",          "",         "nightly" },
    nested   = { "a/b/c",            "a",        "b/c" },
)]
fn split_scoped_name_parses(input: &str, ns: &str, name: &str) {
    assert_eq!(split_scoped_name(input), (ns, name));
}

#[test]
fn owner_id_display_is_scoped() {
    let owner = OwnerId::new("tenant-a", "nightly");
    assert_eq!(owner.to_string(), "tenant-a/nightly");
}

#[test]
fn owner_id_serializes_as_string() {
    let owner = OwnerId::new("tenant-b", "weekly");
    let json = serde_json::to_string(&owner).unwrap();
    assert_eq!(json, "\"tenant-b/weekly\"");

    let parsed: OwnerId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, owner);
}

#[test]
fn owner_id_parse_roundtrip() {
    let owner = OwnerId::parse("ns/name");
    assert_eq!(&*owner.namespace, "ns");
    assert_eq!(owner.name, "name");
}
