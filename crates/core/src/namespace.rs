// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespaced names: the [`Namespace`] newtype and [`OwnerId`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tenant namespace.
///
/// Wraps a `String` to distinguish namespace values from other string
/// fields at the type level. An empty `Namespace` means unscoped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Create a new `Namespace` from any string-like value.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Consume the newtype, returning the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::ops::Deref for Namespace {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Namespace {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Namespace {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity of a schedule-bearing declaration.
///
/// Serializes as `"{namespace}/{name}"` so that refs stored in effective
/// schedule records stay readable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId {
    pub namespace: Namespace,
    pub name: String,
}

impl OwnerId {
    pub fn new(namespace: impl Into<Namespace>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `"{namespace}/{name}"` (or a bare name).
    pub fn parse(scoped: &str) -> Self {
        let (ns, name) = split_scoped_name(scoped);
        Self::new(ns, name)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&scoped_name(&self.namespace, &self.name))
    }
}

impl Serialize for OwnerId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OwnerId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(OwnerId::parse(&s))
    }
}

/// Build a namespace-scoped key from namespace and name.
///
/// When namespace is empty, returns the bare name.
/// Otherwise returns `"{namespace}/{name}"`.
pub fn scoped_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", namespace, name)
    }
}

/// Parse a namespace-scoped key into `(namespace, name)`.
///
/// Returns `("", key)` when no slash is present.
pub fn split_scoped_name(scoped: &str) -> (&str, &str) {
    match scoped.split_once('/') {
        Some((ns, name)) => (ns, name),
        None => ("", scoped),
    }
}

#[cfg(test)]
#[path = "namespace_tests.rs"]
mod tests;
