use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::IngestionError;
use crate::types::SourceKind;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (job failed).
    Error,
    /// Critical error (the source could not be read at all).
    Critical,
}

/// Context about one ingestion job.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Id of the job within its runner.
    pub job: u64,
    /// The input path.
    pub path: PathBuf,
    /// Detected source kind (`Unknown` if detection failed).
    pub kind: SourceKind,
}

/// Stats reported on successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Raw tables returned by extraction.
    pub tables: usize,
    /// Columns in the normalized dataset.
    pub columns: usize,
    /// Rows in the normalized dataset.
    pub rows: usize,
}

/// Observer interface for job outcomes.
///
/// Callbacks run on the worker thread, before the terminal event is delivered.
pub trait IngestionObserver: Send + Sync {
    /// Called when a job succeeds.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when a job fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a job failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called when a job stops at a cancellation checkpoint.
    fn on_cancelled(&self, _ctx: &IngestionContext) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_cancelled(&self, ctx: &IngestionContext) {
        for o in &self.observers {
            o.on_cancelled(ctx);
        }
    }
}

/// Logs job outcomes through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        info!(
            job = ctx.job,
            kind = ?ctx.kind,
            path = %ctx.path.display(),
            tables = stats.tables,
            columns = stats.columns,
            rows = stats.rows,
            "ingest ok"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        warn!(job = ctx.job, ?severity, kind = ?ctx.kind, path = %ctx.path.display(), %error, "ingest failed");
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        error!(job = ctx.job, ?severity, kind = ?ctx.kind, path = %ctx.path.display(), %error, "ingest alert");
    }

    fn on_cancelled(&self, ctx: &IngestionContext) {
        info!(job = ctx.job, path = %ctx.path.display(), "ingest cancelled");
    }
}

/// Classify an error for observer callbacks.
pub fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::SourceUnreadable { .. } => IngestionSeverity::Critical,
        IngestionError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        IngestionError::DependencyMissing { .. } | IngestionError::Panicked { .. } => IngestionSeverity::Critical,
        IngestionError::UnsupportedFormat { .. }
        | IngestionError::NoExtractableContent { .. }
        | IngestionError::EmptyTable { .. }
        | IngestionError::SheetNotFound { .. }
        | IngestionError::UnknownColumns { .. } => IngestionSeverity::Error,
        #[cfg(feature = "excel")]
        IngestionError::Excel(_) => IngestionSeverity::Error,
    }
}
