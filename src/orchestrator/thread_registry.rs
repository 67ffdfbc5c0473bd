//! In-process view of each thread's run state.
//!
//! A thread is `Running` while a stream is producing events for it and
//! `Suspended` once the engine paused it for human input. Threads with no
//! entry are idle. The registry is advisory: it does not lock threads, and
//! a suspension persisted by an earlier process is unknown to it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Run state of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    /// A stream is producing events.
    Running,
    /// Paused awaiting a resume command.
    Suspended,
}

impl ThreadStatus {
    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: ThreadStatus) -> bool {
        matches!(
            (self, next),
            (ThreadStatus::Running, ThreadStatus::Suspended)
                | (ThreadStatus::Suspended, ThreadStatus::Running)
        )
    }
}

/// How a new stream related to the thread's previous state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// Fresh run on an idle thread.
    Started,
    /// Resume command on a suspended thread.
    Resumed,
    /// Fresh run on a suspended thread; the pending suspension is abandoned.
    AbandonedSuspension,
    /// Resume command on a thread with no known suspension; the checkpoint
    /// backend decides whether there is anything to resume.
    ResumeUnverified,
    /// Another stream is already running on the thread.
    Concurrent,
}

#[derive(Debug, Clone, Copy)]
struct ThreadEntry {
    status: ThreadStatus,
    /// Streams currently producing events for the thread.
    running: usize,
    /// When `status` last changed.
    since: Instant,
}

impl ThreadEntry {
    fn new(status: ThreadStatus, running: usize) -> Self {
        Self {
            status,
            running,
            since: Instant::now(),
        }
    }
}

/// Thread id to status map.
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    threads: Mutex<HashMap<String, ThreadEntry>>,
}

impl ThreadRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status; `None` means idle.
    #[must_use]
    pub fn status(&self, thread_id: &str) -> Option<ThreadStatus> {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(thread_id)
            .map(|entry| entry.status)
    }

    /// Number of streams currently running on `thread_id`.
    #[must_use]
    pub fn running_streams(&self, thread_id: &str) -> usize {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(thread_id)
            .map_or(0, |entry| entry.running)
    }

    /// Number of threads with any recorded state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no thread has recorded state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark a stream as starting on `thread_id`.
    pub fn begin(&self, thread_id: &str, resume: bool) -> BeginOutcome {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = threads.get(thread_id).copied();
        let outcome = match (previous.map(|entry| entry.status), resume) {
            (Some(ThreadStatus::Running), _) => BeginOutcome::Concurrent,
            (Some(ThreadStatus::Suspended), true) => BeginOutcome::Resumed,
            (Some(ThreadStatus::Suspended), false) => BeginOutcome::AbandonedSuspension,
            (None, true) => BeginOutcome::ResumeUnverified,
            (None, false) => BeginOutcome::Started,
        };
        let running = previous.map_or(0, |entry| entry.running) + 1;
        let entry = match previous {
            Some(entry) if entry.status == ThreadStatus::Running => ThreadEntry { running, ..entry },
            _ => ThreadEntry::new(ThreadStatus::Running, running),
        };
        threads.insert(thread_id.to_owned(), entry);
        drop(threads);

        match outcome {
            BeginOutcome::Concurrent => {
                warn!(thread_id, running, "stream started while another is running on the thread");
            }
            BeginOutcome::AbandonedSuspension => {
                warn!(thread_id, "fresh request on suspended thread, abandoning suspension");
            }
            BeginOutcome::Resumed => info!(thread_id, "resuming suspended thread"),
            BeginOutcome::ResumeUnverified | BeginOutcome::Started => {}
        }
        outcome
    }

    /// Like [`ThreadRegistry::begin`], returning a guard that calls
    /// [`ThreadRegistry::finish`] when dropped.
    pub fn enter(self: &Arc<Self>, thread_id: &str, resume: bool) -> (BeginOutcome, RunGuard) {
        let outcome = self.begin(thread_id, resume);
        let guard = RunGuard {
            registry: Arc::clone(self),
            thread_id: thread_id.to_owned(),
        };
        (outcome, guard)
    }

    /// Record that the engine suspended `thread_id`.
    pub fn suspend(&self, thread_id: &str) {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        let current = threads.get(thread_id).copied();
        if let Some(entry) = current {
            if !entry.status.can_transition_to(ThreadStatus::Suspended) {
                warn!(thread_id, status = ?entry.status, "ignoring duplicate suspension");
                return;
            }
        }
        let running = current.map_or(0, |entry| entry.running);
        threads.insert(thread_id.to_owned(), ThreadEntry::new(ThreadStatus::Suspended, running));
    }

    /// Record that one stream for `thread_id` ended. A suspended thread
    /// stays suspended; a running one becomes idle once its last stream
    /// ends.
    pub fn finish(&self, thread_id: &str) {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = threads.get_mut(thread_id) else {
            return;
        };
        entry.running = entry.running.saturating_sub(1);
        if entry.status == ThreadStatus::Running && entry.running == 0 {
            threads.remove(thread_id);
        }
    }

    /// Forget suspensions that have waited at least `max_age` for a resume
    /// and have no stream attached. Returns how many were dropped.
    pub fn evict_suspended(&self, max_age: Duration) -> usize {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        let before = threads.len();
        threads.retain(|_, entry| {
            entry.status != ThreadStatus::Suspended
                || entry.running > 0
                || entry.since.elapsed() < max_age
        });
        before - threads.len()
    }
}

/// Marks a thread's stream as ended when dropped.
pub struct RunGuard {
    registry: Arc<ThreadRegistry>,
    thread_id: String,
}

impl RunGuard {
    /// Record a suspension for the guarded thread.
    pub fn suspend(&self) {
        self.registry.suspend(&self.thread_id);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.finish(&self.thread_id);
    }
}
