use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::IngestionError;
use crate::types::NormalizedDataset;

/// Pipeline stage a job has just completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Extraction returned `tables` raw tables.
    Extracted { tables: usize },
    /// Repair and alignment produced `columns` columns.
    Repaired { columns: usize },
    /// Normalization produced `rows` rows.
    Normalized { rows: usize },
}

/// Terminal outcome of a job. Exactly one is delivered per job.
#[derive(Debug)]
pub enum JobOutcome {
    /// Stopped at a cancellation checkpoint; carries neither data nor error.
    Cancelled,
    Succeeded(NormalizedDataset),
    Failed(IngestionError),
}

impl JobOutcome {
    pub fn dataset(&self) -> Option<&NormalizedDataset> {
        match self {
            Self::Succeeded(ds) => Some(ds),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&IngestionError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Lifecycle notifications delivered on the runner's outcome channel.
#[derive(Debug)]
pub enum JobEvent {
    /// A worker picked the job up. Not sent for jobs cancelled before starting.
    Started { job: u64, source: String },
    Progress { job: u64, stage: JobStage },
    /// Terminal notification, sent exactly once per job.
    Finished {
        job: u64,
        source: String,
        outcome: JobOutcome,
    },
}

impl JobEvent {
    pub fn job(&self) -> u64 {
        match self {
            Self::Started { job, .. } | Self::Progress { job, .. } | Self::Finished { job, .. } => *job,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

/// Live job counters for a runner.
///
/// The runner updates these from worker threads; callers can snapshot them at any time.
#[derive(Debug, Default)]
pub struct JobMetrics {
    submitted: AtomicU64,
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,

    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl JobMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_submitted(&self) {
        let _ = self.submitted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn on_started(&self) {
        let _ = self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active, now);
    }

    pub(crate) fn on_finished(&self, outcome: &JobOutcome, was_running: bool) {
        let counter = match outcome {
            JobOutcome::Cancelled => &self.cancelled,
            JobOutcome::Succeeded(_) => &self.succeeded,
            JobOutcome::Failed(_) => &self.failed,
        };
        let _ = counter.fetch_add(1, Ordering::SeqCst);
        if was_running {
            let _ = self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> JobMetricsSnapshot {
        let submitted = self.submitted.load(Ordering::SeqCst);
        let succeeded = self.succeeded.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let cancelled = self.cancelled.load(Ordering::SeqCst);
        JobMetricsSnapshot {
            submitted,
            started: self.started.load(Ordering::SeqCst),
            succeeded,
            failed,
            cancelled,
            in_flight: submitted.saturating_sub(succeeded + failed + cancelled),
            max_active: self.max_active.load(Ordering::SeqCst),
        }
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`JobMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobMetricsSnapshot {
    pub submitted: u64,
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Submitted jobs without a terminal outcome yet.
    pub in_flight: u64,
    /// Highest number of jobs seen running at once.
    pub max_active: usize,
}

impl fmt::Display for JobMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "submitted={}, started={}, succeeded={}, failed={}, cancelled={}, in_flight={}, max_active={}",
            self.submitted,
            self.started,
            self.succeeded,
            self.failed,
            self.cancelled,
            self.in_flight,
            self.max_active
        )
    }
}
