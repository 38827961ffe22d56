//! Background execution of ingestion jobs.
//!
//! This module sits "above" [`crate::ingestion`] and [`crate::processing`] and provides:
//!
//! - A bounded worker pool running one job per submitted path
//! - Cooperative, per-job cancellation (tokens and optional deadlines)
//! - A single-consumer event channel carrying exactly one terminal outcome per job
//! - Live job metrics + observer hooks for monitoring
//!
//! Workers run the chain in parallel; the thread that owns the [`JobRunner`] consumes events
//! one at a time, which is where shared merge state should be mutated.

mod observer;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::{
    detect_source_kind, extract_tables, severity_for_error, ExtractOptions, IngestionContext, IngestionObserver,
    IngestionSeverity, IngestionStats, TracingObserver,
};
use crate::processing::{concat_aligned, normalize, repair_columns_with_report, NormalizeOptions};
use crate::types::{source_name, NormalizedDataset, SourceDocument};

pub use observer::{JobEvent, JobMetrics, JobMetricsSnapshot, JobOutcome, JobStage};

/// Per-job pipeline options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub extract: ExtractOptions,
    pub normalize: NormalizeOptions,
}

/// Configuration for the [`JobRunner`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Options used by jobs that don't carry their own.
    pub ingest: IngestOptions,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
    /// Observer notified of every job outcome.
    #[serde(skip)]
    pub observer: Option<Arc<dyn IngestionObserver>>,
}

impl RunnerOptions {
    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl fmt::Debug for RunnerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerOptions")
            .field("num_threads", &self.num_threads)
            .field("ingest", &self.ingest)
            .field("alert_at_or_above", &self.alert_at_or_above)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            num_threads: None,
            ingest: IngestOptions::default(),
            alert_at_or_above: IngestionSeverity::Critical,
            observer: Some(Arc::new(TracingObserver)),
        }
    }
}

/// One source to ingest.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub path: PathBuf,
    /// Overrides [`RunnerOptions::ingest`] for this job.
    pub options: Option<IngestOptions>,
    /// Treated as a cancellation trigger once passed.
    pub deadline: Option<Instant>,
}

impl IngestRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: None,
            deadline: None,
        }
    }

    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }
}

/// Shared cancellation flag for one job.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobState {
    Pending,
    Running,
    Cancelled,
    Succeeded,
    Failed,
}

impl JobState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Cancelled,
            3 => Self::Succeeded,
            _ => Self::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Succeeded | Self::Failed)
    }
}

/// Caller-side handle to a submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: u64,
    source: String,
    token: CancellationToken,
    state: Arc<AtomicU8>,
}

impl JobHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// File name of the job's source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Request cancellation. Takes effect at the job's next checkpoint.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }
}

/// Result of [`run_ingest`] when no error occurred.
#[derive(Debug)]
pub enum ChainOutcome {
    Completed {
        dataset: NormalizedDataset,
        stats: IngestionStats,
    },
    /// A checkpoint asked the chain to stop.
    Cancelled,
}

/// Run extract → repair → align → normalize for one detected source, synchronously.
///
/// `checkpoint` is called after each stage; returning `false` stops the chain with
/// [`ChainOutcome::Cancelled`].
pub fn run_ingest(
    document: &SourceDocument,
    options: &IngestOptions,
    mut checkpoint: impl FnMut(JobStage) -> bool,
) -> IngestionResult<ChainOutcome> {
    let tables = extract_tables(document, &options.extract)?;
    debug!(source = %document.name(), tables = tables.len(), "extracted");
    if !checkpoint(JobStage::Extracted { tables: tables.len() }) {
        return Ok(ChainOutcome::Cancelled);
    }

    let repaired: Vec<_> = tables
        .iter()
        .map(|t| {
            let (table, report) = repair_columns_with_report(t);
            if !report.dropped.is_empty() {
                debug!(source = %document.name(), dropped = ?report.dropped, "columns repaired");
            }
            table
        })
        .collect();
    let combined = concat_aligned(&repaired);
    if !checkpoint(JobStage::Repaired {
        columns: combined.column_count(),
    }) {
        return Ok(ChainOutcome::Cancelled);
    }

    let dataset = normalize(document.path(), &combined, &options.normalize)?;
    if !checkpoint(JobStage::Normalized {
        rows: dataset.row_count(),
    }) {
        return Ok(ChainOutcome::Cancelled);
    }

    let stats = IngestionStats {
        tables: tables.len(),
        columns: dataset.column_count(),
        rows: dataset.row_count(),
    };
    Ok(ChainOutcome::Completed { dataset, stats })
}

/// Runs ingestion jobs on a bounded pool and delivers their events on one channel.
///
/// The runner is the single consumer of its channel: call [`JobRunner::recv`] (or the
/// non-blocking variants) from the coordinating thread.
pub struct JobRunner {
    pool: ThreadPool,
    opts: RunnerOptions,
    events_tx: Sender<JobEvent>,
    events_rx: Receiver<JobEvent>,
    next_id: AtomicU64,
    metrics: Arc<JobMetrics>,
}

impl JobRunner {
    /// Create a runner with the given options.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads == Some(0)` or the thread pool cannot be built.
    pub fn new(opts: RunnerOptions) -> Self {
        if let Some(n) = opts.num_threads {
            assert!(n > 0, "num_threads must be > 0 when set");
        }

        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("ingest-worker-{i}"))
            .build()
            .expect("failed to build rayon thread pool");

        let (events_tx, events_rx) = mpsc::channel();
        Self {
            pool,
            opts,
            events_tx,
            events_rx,
            next_id: AtomicU64::new(0),
            metrics: Arc::new(JobMetrics::new()),
        }
    }

    /// Get a handle to live job metrics.
    pub fn metrics(&self) -> Arc<JobMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.opts
    }

    /// Submit one job with a fresh cancellation token.
    pub fn submit(&self, request: IngestRequest) -> JobHandle {
        self.submit_with_token(request, CancellationToken::new())
    }

    /// Submit one job controlled by `token`.
    ///
    /// The job starts without waiting for previously submitted jobs.
    pub fn submit_with_token(&self, request: IngestRequest, token: CancellationToken) -> JobHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = JobHandle {
            id,
            source: source_name(&request.path),
            token,
            state: Arc::new(AtomicU8::new(JobState::Pending as u8)),
        };

        let job = Job {
            id,
            source: handle.source.clone(),
            options: request.options.clone().unwrap_or_else(|| self.opts.ingest.clone()),
            request,
            token: handle.token.clone(),
            state: Arc::clone(&handle.state),
            observer: self.opts.observer.clone(),
            alert_at_or_above: self.opts.alert_at_or_above,
            events: self.events_tx.clone(),
            metrics: Arc::clone(&self.metrics),
        };

        self.metrics.on_submitted();
        debug!(job = id, source = %handle.source, "job submitted");
        self.pool.spawn(move || job.run());
        handle
    }

    /// Block until the next event arrives.
    pub fn recv(&self) -> Option<JobEvent> {
        self.events_rx.recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<JobEvent> {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Next event if one is already queued.
    pub fn try_recv(&self) -> Option<JobEvent> {
        match self.events_rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRunner")
            .field("threads", &self.pool.current_num_threads())
            .field("opts", &self.opts)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

struct Job {
    id: u64,
    source: String,
    options: IngestOptions,
    request: IngestRequest,
    token: CancellationToken,
    state: Arc<AtomicU8>,
    observer: Option<Arc<dyn IngestionObserver>>,
    alert_at_or_above: IngestionSeverity,
    events: Sender<JobEvent>,
    metrics: Arc<JobMetrics>,
}

impl Job {
    fn should_stop(&self) -> bool {
        self.token.is_cancelled() || self.request.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn send(&self, event: JobEvent) {
        // The receiver lives as long as the runner; a send error only means nobody is listening.
        let _ = self.events.send(event);
    }

    fn run(self) {
        let ctx = IngestionContext {
            job: self.id,
            path: self.request.path.clone(),
            kind: detect_source_kind(&self.request.path),
        };

        if self.should_stop() {
            self.finish(&ctx, JobOutcome::Cancelled, false);
            return;
        }

        self.state.store(JobState::Running as u8, Ordering::SeqCst);
        self.metrics.on_started();
        self.send(JobEvent::Started {
            job: self.id,
            source: self.source.clone(),
        });

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let document = SourceDocument::detect(&self.request.path)?;
            run_ingest(&document, &self.options, |stage| {
                self.send(JobEvent::Progress { job: self.id, stage });
                !self.should_stop()
            })
        }))
        .unwrap_or_else(|payload| Err(panicked(&self.request.path, payload.as_ref())));

        let outcome = match result {
            Ok(ChainOutcome::Completed { dataset, stats }) => {
                if let Some(obs) = &self.observer {
                    obs.on_success(&ctx, stats);
                }
                JobOutcome::Succeeded(dataset)
            }
            Ok(ChainOutcome::Cancelled) => JobOutcome::Cancelled,
            Err(e) => {
                if let Some(obs) = &self.observer {
                    let sev = severity_for_error(&e);
                    obs.on_failure(&ctx, sev, &e);
                    if sev >= self.alert_at_or_above {
                        obs.on_alert(&ctx, sev, &e);
                    }
                }
                JobOutcome::Failed(e)
            }
        };
        self.finish(&ctx, outcome, true);
    }

    fn finish(&self, ctx: &IngestionContext, outcome: JobOutcome, was_running: bool) {
        let state = match &outcome {
            JobOutcome::Cancelled => {
                if let Some(obs) = &self.observer {
                    obs.on_cancelled(ctx);
                }
                JobState::Cancelled
            }
            JobOutcome::Succeeded(_) => JobState::Succeeded,
            JobOutcome::Failed(_) => JobState::Failed,
        };
        self.state.store(state as u8, Ordering::SeqCst);
        self.metrics.on_finished(&outcome, was_running);
        self.send(JobEvent::Finished {
            job: self.id,
            source: self.source.clone(),
            outcome,
        });
    }
}

fn panicked(path: &Path, payload: &(dyn std::any::Any + Send)) -> IngestionError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    IngestionError::Panicked {
        path: path.to_path_buf(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::{
        run_ingest, CancellationToken, ChainOutcome, IngestOptions, IngestRequest, JobEvent, JobOutcome,
        JobRunner, JobStage, JobState, RunnerOptions,
    };
    use crate::error::IngestionError;
    use crate::ingestion::ExtractOptions;
    use crate::types::SourceDocument;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    fn runner() -> JobRunner {
        JobRunner::new(RunnerOptions {
            num_threads: Some(2),
            observer: None,
            ..Default::default()
        })
    }

    fn drain_job(runner: &JobRunner, job: u64) -> Vec<JobEvent> {
        let mut events = Vec::new();
        loop {
            let event = runner.recv_timeout(Duration::from_secs(10)).expect("job timed out");
            assert_eq!(event.job(), job);
            let done = event.is_terminal();
            events.push(event);
            if done {
                return events;
            }
        }
    }

    #[test]
    fn chain_stops_at_checkpoint_after_extraction() {
        let file = csv_file("a,b\n1,2\n");
        let doc = SourceDocument::detect(file.path()).unwrap();
        let mut seen = Vec::new();
        let out = run_ingest(&doc, &IngestOptions::default(), |stage| {
            seen.push(stage);
            !matches!(stage, JobStage::Extracted { .. })
        })
        .unwrap();
        assert!(matches!(out, ChainOutcome::Cancelled));
        assert_eq!(seen, vec![JobStage::Extracted { tables: 1 }]);
    }

    #[test]
    fn successful_job_emits_started_progress_and_one_terminal_event() {
        let file = csv_file("Name,Qty\nAda,1\nGrace,2\n");
        let runner = runner();
        let handle = runner.submit(IngestRequest::new(file.path()));

        let events = drain_job(&runner, handle.id());
        assert!(matches!(events[0], JobEvent::Started { .. }));
        assert!(matches!(
            events[1],
            JobEvent::Progress { stage: JobStage::Extracted { tables: 1 }, .. }
        ));
        let JobEvent::Finished { outcome: JobOutcome::Succeeded(ds), .. } = events.last().unwrap() else {
            panic!("expected success, got {events:?}");
        };
        assert_eq!(ds.row_count(), 2);
        assert_eq!(handle.state(), JobState::Succeeded);
        assert!(runner.try_recv().is_none());
    }

    #[test]
    fn cancelled_before_start_emits_only_finished() {
        let file = csv_file("a\n1\n");
        let runner = runner();
        let token = CancellationToken::new();
        token.cancel();
        let handle = runner.submit_with_token(IngestRequest::new(file.path()), token);

        let events = drain_job(&runner, handle.id());
        assert_eq!(events.len(), 1);
        let JobEvent::Finished { outcome, .. } = &events[0] else {
            panic!("expected finished");
        };
        assert!(matches!(outcome, JobOutcome::Cancelled));
        assert!(outcome.dataset().is_none());
        assert!(outcome.error().is_none());
        assert_eq!(handle.state(), JobState::Cancelled);
    }

    #[test]
    fn passed_deadline_cancels_the_job() {
        let file = csv_file("a\n1\n");
        let runner = runner();
        let handle = runner.submit(IngestRequest::new(file.path()).with_timeout(Duration::ZERO));
        let events = drain_job(&runner, handle.id());
        assert!(matches!(
            events.last(),
            Some(JobEvent::Finished { outcome: JobOutcome::Cancelled, .. })
        ));
    }

    #[test]
    fn missing_file_fails_with_source_unreadable() {
        let runner = runner();
        let handle = runner.submit(IngestRequest::new("/no/such/dir/missing.csv"));
        let events = drain_job(&runner, handle.id());
        let Some(JobEvent::Finished { outcome: JobOutcome::Failed(err), source, .. }) = events.last() else {
            panic!("expected failure");
        };
        assert_eq!(source, "missing.csv");
        assert!(matches!(err, IngestionError::SourceUnreadable { .. }));
        assert_eq!(handle.state(), JobState::Failed);

        let snap = runner.metrics().snapshot();
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.in_flight, 0);
    }

    #[test]
    fn unknown_extension_fails_the_job() {
        let runner = runner();
        let handle = runner.submit(IngestRequest::new("notes.txt"));
        let events = drain_job(&runner, handle.id());
        assert!(matches!(
            events.last(),
            Some(JobEvent::Finished { outcome: JobOutcome::Failed(IngestionError::UnsupportedFormat { .. }), .. })
        ));
    }

    #[test]
    fn options_load_from_json_with_defaults() {
        let opts = RunnerOptions::from_json_str(
            r#"{ "num_threads": 3, "ingest": { "normalize": { "require_columns": true } } }"#,
        )
        .unwrap();
        assert_eq!(opts.num_threads, Some(3));
        assert!(opts.ingest.normalize.require_columns);
        assert_eq!(opts.ingest.extract, ExtractOptions::default());
    }
}
