//! Single-writer token for catalog-mutating batch jobs
//!
//! Crawl runs, learning cycles, rule compilation and wardrobe syncs all touch
//! the same catalog rows. At most one of them runs at a time; a second request
//! gets [`Error::Conflict`] naming the job that holds the lock. The lock is
//! released when the returned [`JobGuard`] is dropped.

use catwalk_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Crawl,
    ApplyLearning,
    CompileRules,
    WardrobeSync,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Crawl => "crawl",
            JobKind::ApplyLearning => "apply_learning",
            JobKind::CompileRules => "compile_rules",
            JobKind::WardrobeSync => "wardrobe_sync",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct RunningJob {
    ticket: u64,
    kind: JobKind,
    token: CancellationToken,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LockState {
    next_ticket: u64,
    running: Option<RunningJob>,
}

/// Snapshot of the job currently holding the lock
#[derive(Debug, Clone, Serialize)]
pub struct RunningJobInfo {
    pub job: JobKind,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchLock {
    state: Arc<Mutex<LockState>>,
}

impl BatchLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, LockState> {
        // A panic while holding the mutex leaves plain data behind; keep going
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the lock for `kind`, or fail with Conflict if another job holds it
    pub fn try_acquire(&self, kind: JobKind) -> Result<JobGuard> {
        let mut state = self.lock_state();

        if let Some(running) = &state.running {
            return Err(Error::Conflict(format!(
                "{} is already running (started {})",
                running.kind,
                running.started_at.to_rfc3339()
            )));
        }

        state.next_ticket += 1;
        let job = RunningJob {
            ticket: state.next_ticket,
            kind,
            token: CancellationToken::new(),
            started_at: Utc::now(),
        };
        state.running = Some(job.clone());

        info!(job = %kind, "Batch lock acquired");

        Ok(JobGuard {
            lock: self.clone(),
            ticket: job.ticket,
            kind,
            token: job.token,
        })
    }

    pub fn current(&self) -> Option<RunningJobInfo> {
        self.lock_state().running.as_ref().map(|job| RunningJobInfo {
            job: job.kind,
            started_at: job.started_at,
        })
    }

    /// Signal cancellation to the running job, if any. The job keeps the
    /// lock until it notices and finishes.
    pub fn cancel_current(&self) -> Option<JobKind> {
        let state = self.lock_state();
        state.running.as_ref().map(|job| {
            job.token.cancel();
            info!(job = %job.kind, "Cancellation requested");
            job.kind
        })
    }

    fn release(&self, ticket: u64) {
        let mut state = self.lock_state();
        if state.running.as_ref().map(|job| job.ticket) == Some(ticket) {
            if let Some(job) = state.running.take() {
                info!(job = %job.kind, "Batch lock released");
            }
        }
    }
}

/// Proof of holding the batch lock; releases it on drop
#[derive(Debug)]
pub struct JobGuard {
    lock: BatchLock,
    ticket: u64,
    kind: JobKind,
    token: CancellationToken,
}

impl JobGuard {
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.lock.release(self.ticket);
    }
}
