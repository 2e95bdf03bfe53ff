// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron expressions and the table of registered entries.
//!
//! Declarations use standard 5-field cron (`minute hour dom month dow`,
//! Sunday = 0 or 7) and the usual `@hourly`-style macros. The `cron` crate
//! wants a seconds field and counts weekdays from 1, so expressions are
//! normalized before parsing. When both day-of-month and day-of-week are
//! restricted, a fire time matching either one fires, as in classic cron.
//! A day field starting with `*` or `?` counts as unrestricted.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("invalid cron expression '{expr}': {reason}")]
    Invalid { expr: String, reason: String },
    #[error("cron expression '{0}' never fires")]
    NeverFires(String),
}

const WEEKDAYS: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// A validated cron expression
#[derive(Clone)]
pub struct CronSchedule {
    expr: String,
    /// Alternatives a fire time may match: two when both day fields are
    /// restricted, one otherwise.
    schedules: Vec<cron::Schedule>,
}

impl CronSchedule {
    /// Parse `expr`, rejecting expressions with no fire time after `now`.
    pub fn parse(expr: &str, now: &DateTime<Utc>) -> Result<Self, CronError> {
        let trimmed = expr.trim();
        let invalid = |reason: String| CronError::Invalid {
            expr: trimmed.to_string(),
            reason,
        };

        let normalized = match macro_expansion(trimmed) {
            Some(expanded) => vec![expanded.to_string()],
            None => {
                let fields: Vec<&str> = trimmed.split_whitespace().collect();
                let &[minute, hour, dom, month, dow] = &fields[..] else {
                    return Err(invalid(format!("expected 5 fields, found {}", fields.len())));
                };
                let dow = weekday_names(dow).map_err(&invalid)?;
                if is_unrestricted(dom) || is_unrestricted(&dow) {
                    vec![format!("0 {minute} {hour} {dom} {month} {dow}")]
                } else {
                    vec![
                        format!("0 {minute} {hour} {dom} {month} *"),
                        format!("0 {minute} {hour} * {month} {dow}"),
                    ]
                }
            }
        };

        let schedules = normalized
            .iter()
            .map(|expr| cron::Schedule::from_str(expr).map_err(|e| invalid(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        let parsed = Self {
            expr: trimmed.to_string(),
            schedules,
        };
        // e.g. "0 0 31 2 *"
        if parsed.next_after(now).is_none() {
            return Err(CronError::NeverFires(parsed.expr));
        }
        Ok(parsed)
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedules
            .iter()
            .filter_map(|schedule| schedule.after(after).next())
            .min()
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronSchedule").field(&self.expr).finish()
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

fn macro_expansion(expr: &str) -> Option<&'static str> {
    Some(match expr.to_ascii_lowercase().as_str() {
        "@yearly" | "@annually" => "0 0 0 1 1 *",
        "@monthly" => "0 0 0 1 * *",
        "@weekly" => "0 0 0 * * SUN",
        "@daily" | "@midnight" => "0 0 0 * * *",
        "@hourly" => "0 0 * * * *",
        _ => return None,
    })
}

fn is_unrestricted(field: &str) -> bool {
    field.starts_with('*') || field.starts_with('?')
}

/// Replace numeric weekdays (0-7) with names, keeping lists, ranges and
/// steps intact: `1-5/2,0` becomes `MON-FRI/2,SUN`. A range ending at 7
/// is split at Saturday: `5-7` becomes `FRI-SAT,SUN`.
fn weekday_names(field: &str) -> Result<String, String> {
    field
        .split(',')
        .map(weekday_item)
        .collect::<Result<Vec<_>, _>>()
        .map(|items| items.join(","))
}

fn weekday_item(item: &str) -> Result<String, String> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None),
    };

    if let Some((low, "7")) = range.split_once('-') {
        if let Ok(low) = low.parse::<usize>() {
            if low < 7 {
                return wrapped_range(low, step);
            }
        }
    }

    let bounds = range
        .split('-')
        .map(|bound| match bound.parse::<usize>() {
            Ok(n) => weekday_name(n).map(str::to_string),
            Err(_) => Ok(bound.to_string()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut out = bounds.join("-");
    if let Some(step) = step {
        out.push('/');
        out.push_str(step);
    }
    Ok(out)
}

/// `low-7[/step]`: the `cron` crate reads `X-SUN` as a reversed range.
fn wrapped_range(low: usize, step: Option<&str>) -> Result<String, String> {
    let every = match step {
        Some(step) => step
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("invalid step '{step}'"))?,
        None => 1,
    };
    let first = weekday_name(low)?;
    let mut out = match step {
        _ if low == 6 => first.to_string(),
        Some(step) => format!("{first}-SAT/{step}"),
        None => format!("{first}-SAT"),
    };
    // Sunday as 0 is already inside the range
    if low > 0 && (7 - low) % every == 0 {
        out.push_str(",SUN");
    }
    Ok(out)
}

fn weekday_name(n: usize) -> Result<&'static str, String> {
    WEEKDAYS
        .get(n)
        .copied()
        .ok_or_else(|| format!("day of week {n} out of range 0-7"))
}

/// Handle for a registered cron entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cron-{}", self.0)
    }
}

struct Entry<A> {
    schedule: CronSchedule,
    next: Option<DateTime<Utc>>,
    action: A,
}

/// Registered cron entries, polled with the current time.
///
/// Entries fire at most once per poll even if several fire times elapsed
/// since the last one, then move to the next fire time after `now`.
pub struct CronTable<A> {
    entries: BTreeMap<EntryId, Entry<A>>,
    next_id: u64,
}

impl<A> Default for CronTable<A> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<A: Clone> CronTable<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schedule` to fire first at its next time after `now`.
    pub fn add(&mut self, schedule: CronSchedule, now: DateTime<Utc>, action: A) -> EntryId {
        let next = schedule.next_after(&now);
        self.insert(schedule, next, action)
    }

    /// Register `schedule` with an explicit first fire time, which may
    /// already be due.
    pub fn insert(
        &mut self,
        schedule: CronSchedule,
        next: Option<DateTime<Utc>>,
        action: A,
    ) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            Entry {
                schedule,
                next,
                action,
            },
        );
        id
    }

    pub fn remove(&mut self, id: EntryId) -> Option<A> {
        self.entries.remove(&id).map(|entry| entry.action)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Actions due at `now`, in registration order.
    pub fn fired(&mut self, now: DateTime<Utc>) -> Vec<(EntryId, A)> {
        let mut due = Vec::new();
        for (id, entry) in self.entries.iter_mut() {
            if entry.next.is_some_and(|at| at <= now) {
                due.push((*id, entry.action.clone()));
                entry.next = entry.schedule.next_after(&now);
            }
        }
        due
    }

    /// Pending fire time of `id`, which `fired` has not consumed yet.
    pub fn next_fire(&self, id: EntryId) -> Option<DateTime<Utc>> {
        self.entries.get(&id).and_then(|entry| entry.next)
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.entries.values().filter_map(|entry| entry.next).min()
    }

    pub fn schedule(&self, id: EntryId) -> Option<&CronSchedule> {
        self.entries.get(&id).map(|entry| &entry.schedule)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
