//! Coordinating driver: submit sources, consume job events, apply them to the merge session.
//!
//! A [`Pipeline`] lives on the interactive/coordinating thread. Jobs run in parallel on the
//! runner's pool; their events are handled here one at a time, so the [`MergeCoordinator`] has a
//! single writer and every outcome is applied fully before the next one.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::execution::{IngestRequest, JobEvent, JobHandle, JobRunner, JobStage, RunnerOptions};
use crate::processing::{MergeCoordinator, MergeUpdate, SchemaComparator};

/// One handled job event, as seen by whatever drives progress UI.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Started { job: u64, source: String },
    Progress { job: u64, stage: JobStage },
    /// The job is done. `update` is `None` for cancelled jobs.
    Finished {
        job: u64,
        source: String,
        update: Option<MergeUpdate>,
    },
}

/// Job runner + merge coordinator, driven from one thread.
#[derive(Debug)]
pub struct Pipeline {
    runner: JobRunner,
    coordinator: MergeCoordinator,
    pending: HashMap<u64, JobHandle>,
}

impl Pipeline {
    pub fn new(opts: RunnerOptions) -> Self {
        Self::with_comparator(opts, SchemaComparator::default())
    }

    pub fn with_comparator(opts: RunnerOptions, comparator: SchemaComparator) -> Self {
        Self {
            runner: JobRunner::new(opts),
            coordinator: MergeCoordinator::new(comparator),
            pending: HashMap::new(),
        }
    }

    /// Submit one source with the runner's default options.
    pub fn open(&mut self, path: impl Into<PathBuf>) -> JobHandle {
        self.submit(IngestRequest::new(path))
    }

    /// Submit a batch. Jobs start without waiting on each other; completion order is not
    /// submission order.
    pub fn open_many<I, P>(&mut self, paths: I) -> Vec<JobHandle>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths.into_iter().map(|p| self.open(p)).collect()
    }

    pub fn submit(&mut self, request: IngestRequest) -> JobHandle {
        let handle = self.runner.submit(request);
        self.pending.insert(handle.id(), handle.clone());
        handle
    }

    /// Jobs submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Cancel every pending job.
    pub fn cancel_all(&self) {
        for handle in self.pending.values() {
            handle.cancel();
        }
    }

    /// Block for the next job event and apply it. Returns `None` when no job is pending.
    pub fn next_event(&mut self) -> Option<PipelineEvent> {
        if self.pending.is_empty() {
            return None;
        }
        let event = self.runner.recv()?;
        Some(self.handle(event))
    }

    /// Process events until every submitted job has finished. Returns the merge updates in the
    /// order they were applied.
    pub fn run_until_idle(&mut self) -> Vec<MergeUpdate> {
        let mut updates = Vec::new();
        while let Some(event) = self.next_event() {
            if let PipelineEvent::Finished { update: Some(update), .. } = event {
                updates.push(update);
            }
        }
        updates
    }

    pub fn coordinator(&self) -> &MergeCoordinator {
        &self.coordinator
    }

    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    /// Discard all merged sources. Jobs still in flight are unaffected and will seed the next
    /// reference schema when they land.
    pub fn reset(&mut self) {
        self.coordinator.reset();
    }

    fn handle(&mut self, event: JobEvent) -> PipelineEvent {
        match event {
            JobEvent::Started { job, source } => PipelineEvent::Started { job, source },
            JobEvent::Progress { job, stage } => PipelineEvent::Progress { job, stage },
            JobEvent::Finished { job, source, outcome } => {
                self.pending.remove(&job);
                debug!(job, source = %source, remaining = self.pending.len(), "job finished");
                let update = self.coordinator.apply(JobEvent::Finished {
                    job,
                    source: source.clone(),
                    outcome,
                });
                PipelineEvent::Finished { job, source, update }
            }
        }
    }
}
