//! Incremental validation and merging of loaded datasets.
//!
//! The first dataset accepted into a [`MergeSession`] defines the reference schema. Later
//! datasets are merged only if their column set equals the reference; otherwise they are rejected
//! and the session is left untouched. The coordinator is a single-writer: it is meant to live on
//! the thread that consumes job outcomes.

use std::collections::HashMap;
use std::fmt;

use tracing::{info, warn};

use crate::execution::{JobEvent, JobOutcome};
use crate::types::{CellValue, NormalizedDataset};

use super::schema::{SchemaComparator, SchemaReport};

/// A dataset that made it into the session.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedSource {
    pub name: String,
    pub dataset: NormalizedDataset,
}

/// Accepted datasets (in acceptance order) and their concatenation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSession {
    accepted: Vec<AcceptedSource>,
    merged: Option<NormalizedDataset>,
}

impl MergeSession {
    pub fn accepted(&self) -> &[AcceptedSource] {
        &self.accepted
    }

    pub fn merged(&self) -> Option<&NormalizedDataset> {
        self.merged.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// A dataset turned away because its columns differ from the reference schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRejection {
    /// Name of the rejected source.
    pub source: String,
    /// Reference (left) vs. rejected source (right).
    pub report: SchemaReport,
}

impl fmt::Display for MergeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' has different columns than the loaded data", self.source)?;
        if !self.report.missing().is_empty() {
            write!(f, "; missing: {}", self.report.missing().join(", "))?;
        }
        if !self.report.extra().is_empty() {
            write!(f, "; extra: {}", self.report.extra().join(", "))?;
        }
        if !self.report.collisions.is_empty() {
            write!(f, "; ambiguous: {}", self.report.collisions.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for MergeRejection {}

/// What happened to a dataset handed to [`MergeCoordinator::accept`].
#[derive(Debug, Clone, PartialEq)]
pub enum MergeDecision {
    /// First dataset of the session; it is now the reference schema and the merged view.
    Reference {
        source: String,
        rows: usize,
        columns: usize,
    },
    /// Schema matched; the merged view was rebuilt.
    Merged {
        source: String,
        /// Number of accepted sources after this one.
        accepted: usize,
        /// Row count of the new merged view.
        rows: usize,
    },
    /// Schema mismatch; nothing changed.
    Rejected(MergeRejection),
}

/// Result of applying one job event to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeUpdate {
    Decision(MergeDecision),
    /// The job failed; the session is unchanged.
    LoadFailed { source: String, message: String },
}

/// Owns the [`MergeSession`] and decides the fate of each arriving dataset.
#[derive(Debug, Clone, Default)]
pub struct MergeCoordinator {
    session: MergeSession,
    comparator: SchemaComparator,
}

impl MergeCoordinator {
    pub fn new(comparator: SchemaComparator) -> Self {
        Self {
            session: MergeSession::default(),
            comparator,
        }
    }

    pub fn session(&self) -> &MergeSession {
        &self.session
    }

    pub fn accepted(&self) -> &[AcceptedSource] {
        self.session.accepted()
    }

    pub fn accepted_names(&self) -> Vec<&str> {
        self.session.accepted.iter().map(|a| a.name.as_str()).collect()
    }

    /// Column order of the reference dataset, if any.
    pub fn reference_columns(&self) -> Option<&[String]> {
        self.session.accepted.first().map(|a| a.dataset.columns())
    }

    pub fn merged(&self) -> Option<&NormalizedDataset> {
        self.session.merged()
    }

    /// Validate `dataset` against the reference schema and merge it if compatible.
    pub fn accept(&mut self, source: impl Into<String>, dataset: NormalizedDataset) -> MergeDecision {
        let source = source.into();

        let Some(reference) = self.reference_columns() else {
            info!(source = %source, rows = dataset.row_count(), columns = dataset.column_count(), "reference dataset loaded");
            let decision = MergeDecision::Reference {
                source: source.clone(),
                rows: dataset.row_count(),
                columns: dataset.column_count(),
            };
            self.session.merged = Some(dataset.clone());
            self.session.accepted.push(AcceptedSource { name: source, dataset });
            return decision;
        };

        let report = self.comparator.compare_columns(reference, dataset.columns());
        if !report.is_equal() {
            let rejection = MergeRejection { source, report };
            warn!(%rejection, "dataset rejected");
            return MergeDecision::Rejected(rejection);
        }

        self.session.accepted.push(AcceptedSource {
            name: source.clone(),
            dataset,
        });
        let merged = self.concat_accepted();
        let rows = merged.row_count();
        self.session.merged = Some(merged);

        let accepted = self.session.accepted.len();
        info!(source = %source, accepted, rows, "datasets merged");
        MergeDecision::Merged { source, accepted, rows }
    }

    /// Apply one delivered job event. Only terminal events can change the session.
    pub fn apply(&mut self, event: JobEvent) -> Option<MergeUpdate> {
        let JobEvent::Finished { source, outcome, .. } = event else {
            return None;
        };
        match outcome {
            JobOutcome::Succeeded(dataset) => Some(MergeUpdate::Decision(self.accept(source, dataset))),
            JobOutcome::Failed(err) => Some(MergeUpdate::LoadFailed {
                source,
                message: err.to_string(),
            }),
            JobOutcome::Cancelled => None,
        }
    }

    /// Discard every source. The next accepted dataset becomes the new reference.
    pub fn reset(&mut self) {
        self.session = MergeSession::default();
    }

    /// Stack all accepted datasets in acceptance order, using the reference column order.
    fn concat_accepted(&self) -> NormalizedDataset {
        let Some(first) = self.session.accepted.first() else {
            return NormalizedDataset::default();
        };
        let columns = first.dataset.columns().to_vec();
        let keys: Vec<String> = columns.iter().map(|c| self.comparator.key(c)).collect();

        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        for source in &self.session.accepted {
            let position: HashMap<String, usize> = source
                .dataset
                .columns()
                .iter()
                .enumerate()
                .map(|(i, c)| (self.comparator.key(c), i))
                .collect();
            let order: Vec<usize> = keys.iter().filter_map(|k| position.get(k).copied()).collect();
            rows.extend(
                source
                    .dataset
                    .rows()
                    .iter()
                    .map(|row| order.iter().map(|&i| row[i].clone()).collect::<Vec<_>>()),
            );
        }

        NormalizedDataset::new(columns, rows)
    }
}
