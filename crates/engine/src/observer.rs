// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job event bus.
//!
//! Tracks the last known state of every downstream job and fires registered
//! callbacks exactly once when a job reaches a terminal event. Events are
//! applied by a single consumer ([`EventLoop`]); queries and callback
//! registration take the table mutex from any thread.

use crate::error::CallbackError;
use ks_core::{JobClassification, JobEvent, JobEventKind, JobId, JobType, RepositoryId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Completion callback. Receives the job as it was when the terminal event
/// was applied; `last_event` tells which event fired it.
pub type Callback = Box<dyn FnOnce(&ObservableJob) -> Result<(), CallbackError> + Send>;

/// Observer's view of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableJob {
    pub id: JobId,
    pub repository: RepositoryId,
    pub job_type: Option<JobType>,
    pub exclusive: bool,
    /// `None` for a placeholder created by callback registration before any
    /// event or reservation arrived
    pub classification: Option<JobClassification>,
    pub last_event: Option<JobEventKind>,
    /// True once an event from the watch source has been applied
    pub seen: bool,
}

impl ObservableJob {
    fn placeholder(id: JobId) -> Self {
        Self {
            id,
            repository: RepositoryId::new(""),
            job_type: None,
            exclusive: false,
            classification: None,
            last_event: None,
            seen: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.classification == Some(JobClassification::Running)
    }

    fn is_terminal(&self) -> bool {
        self.classification.is_some_and(|c| c.is_terminal())
    }
}

/// Per-namespace outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamespaceCounters {
    pub succeeded: u64,
    pub failed: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserverStats {
    pub namespaces: BTreeMap<String, NamespaceCounters>,
}

impl ObserverStats {
    pub fn namespace(&self, namespace: &str) -> NamespaceCounters {
        self.namespaces.get(namespace).copied().unwrap_or_default()
    }
}

struct Entry {
    job: ObservableJob,
    callbacks: Vec<Callback>,
}

#[derive(Default)]
struct State {
    jobs: HashMap<JobId, Entry>,
    stats: ObserverStats,
}

enum Message {
    Event(JobEvent),
    /// Run callbacks registered after the job had already finished
    Flush(JobId),
}

pub struct Observer {
    state: Mutex<State>,
    tx: mpsc::UnboundedSender<Message>,
}

/// Single consumer that owns event application. Run it on the runtime with
/// `tokio::spawn(event_loop.run())`.
pub struct EventLoop {
    observer: Arc<Observer>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl EventLoop {
    pub async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            match message {
                Message::Event(event) => self.observer.process(event),
                Message::Flush(id) => self.observer.flush(&id),
            }
        }
        tracing::debug!("observer event loop stopped");
    }
}

impl Observer {
    pub fn new() -> (Arc<Self>, EventLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        let observer = Arc::new(Self {
            state: Mutex::new(State::default()),
            tx,
        });
        let event_loop = EventLoop {
            observer: Arc::clone(&observer),
            rx,
        };
        (observer, event_loop)
    }

    /// Queue an event for the consumer loop.
    pub fn publish(&self, event: JobEvent) {
        if self.tx.send(Message::Event(event)).is_err() {
            tracing::warn!("observer event loop is gone, dropping event");
        }
    }

    /// Apply one event and run any callbacks it releases.
    ///
    /// Called by the [`EventLoop`]; exposed so callers without a runtime can
    /// drive the observer directly.
    pub fn process(&self, event: JobEvent) {
        let (snapshot, callbacks) = {
            let mut state = self.state.lock();
            let existed = state.jobs.contains_key(&event.id);
            let entry = state
                .jobs
                .entry(event.id.clone())
                .or_insert_with(|| Entry {
                    job: ObservableJob::placeholder(event.id.clone()),
                    callbacks: Vec::new(),
                });

            entry.job.repository = event.repository.clone();
            entry.job.job_type = Some(event.job_type);
            entry.job.exclusive = event.exclusive;
            entry.job.classification = Some(event.kind.classify(entry.job.classification));
            entry.job.last_event = Some(event.kind);
            entry.job.seen = true;

            if !event.kind.is_terminal() {
                tracing::debug!(event = %event.log_summary(), "observed job update");
                return;
            }

            let callbacks = std::mem::take(&mut entry.callbacks);
            let snapshot = entry.job.clone();
            let namespace = event.id.namespace().to_string();
            match event.kind {
                JobEventKind::Failed => {
                    let counters = state.stats.namespaces.entry(namespace).or_default();
                    counters.failed += 1;
                    counters.total += 1;
                }
                // A success for a job we never saw is a resync replay, not a
                // new completion
                JobEventKind::Succeeded if existed => {
                    let counters = state.stats.namespaces.entry(namespace).or_default();
                    counters.succeeded += 1;
                    counters.total += 1;
                }
                JobEventKind::Delete => {
                    state.jobs.remove(&event.id);
                }
                _ => {}
            }
            (snapshot, callbacks)
        };

        tracing::info!(
            event = %event.log_summary(),
            callbacks = callbacks.len(),
            "observed terminal job event"
        );
        invoke(&snapshot, callbacks);
    }

    fn flush(&self, id: &JobId) {
        let (snapshot, callbacks) = {
            let mut state = self.state.lock();
            let Some(entry) = state.jobs.get_mut(id) else {
                return;
            };
            if !entry.job.is_terminal() {
                return;
            }
            (entry.job.clone(), std::mem::take(&mut entry.callbacks))
        };
        invoke(&snapshot, callbacks);
    }

    /// Register a callback for the job's next terminal event.
    ///
    /// Creates a placeholder if the job is not known yet. If the job has
    /// already finished, the callback runs on the consumer loop shortly
    /// after.
    pub fn register_callback(&self, id: &JobId, callback: Callback) {
        let late = {
            let mut state = self.state.lock();
            let entry = state.jobs.entry(id.clone()).or_insert_with(|| Entry {
                job: ObservableJob::placeholder(id.clone()),
                callbacks: Vec::new(),
            });
            entry.callbacks.push(callback);
            entry.job.is_terminal()
        };
        if late && self.tx.send(Message::Flush(id.clone())).is_err() {
            tracing::warn!(job_id = %id, "observer event loop is gone, late callback dropped");
        }
    }

    /// Mark an admitted job as running before its first watch event arrives.
    ///
    /// No-op for jobs the watch source has already reported.
    pub fn reserve(&self, id: &JobId, repository: &RepositoryId, job_type: JobType, exclusive: bool) {
        let mut state = self.state.lock();
        let entry = state.jobs.entry(id.clone()).or_insert_with(|| Entry {
            job: ObservableJob::placeholder(id.clone()),
            callbacks: Vec::new(),
        });
        if entry.job.seen {
            return;
        }
        entry.job.repository = repository.clone();
        entry.job.job_type = Some(job_type);
        entry.job.exclusive = exclusive;
        entry.job.classification = Some(JobClassification::Running);
    }

    /// Drop a reservation (and its callbacks) for a job that never launched.
    ///
    /// Returns false if the watch source has reported the job, in which case
    /// its entry is left alone.
    pub fn release(&self, id: &JobId) -> bool {
        let mut state = self.state.lock();
        match state.jobs.get(id) {
            Some(entry) if !entry.job.seen => {
                state.jobs.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: &JobId) -> Option<ObservableJob> {
        self.state.lock().jobs.get(id).map(|e| e.job.clone())
    }

    pub fn is_any_job_running(&self, repository: &RepositoryId) -> bool {
        self.state
            .lock()
            .jobs
            .values()
            .any(|e| &e.job.repository == repository && e.job.is_running())
    }

    pub fn is_exclusive_job_running(&self, repository: &RepositoryId) -> bool {
        self.state
            .lock()
            .jobs
            .values()
            .any(|e| &e.job.repository == repository && e.job.exclusive && e.job.is_running())
    }

    /// Running jobs of `job_type` across all repositories.
    pub fn running_count(&self, job_type: JobType) -> usize {
        self.state
            .lock()
            .jobs
            .values()
            .filter(|e| e.job.job_type == Some(job_type) && e.job.is_running())
            .count()
    }

    /// True if `limit` jobs of this type are running. A limit of 0 means
    /// unlimited.
    pub fn is_concurrency_limit_reached(&self, job_type: JobType, limit: usize) -> bool {
        limit > 0 && self.running_count(job_type) >= limit
    }

    pub fn stats(&self) -> ObserverStats {
        self.state.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn invoke(job: &ObservableJob, callbacks: Vec<Callback>) {
    for (index, callback) in callbacks.into_iter().enumerate() {
        if let Err(e) = callback(job) {
            tracing::warn!(
                job_id = %job.id,
                callback = index,
                error = %e,
                "observer callback failed"
            );
        }
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
