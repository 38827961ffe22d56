//! `tabular-reconcile` loads tabular sources (CSV, spreadsheets, PDF-embedded tables), repairs and
//! normalizes their columns, checks schema compatibility across files, and merges compatible
//! sources into one working [`types::NormalizedDataset`].
//!
//! ## Pipeline
//!
//! For every submitted path a background job runs:
//!
//! 1. **Detect** the source kind from the extension ([`ingestion::detect`])
//! 2. **Extract** raw tables ([`ingestion::extract_tables`]); PDFs get page-by-page heuristic
//!    table recovery with a plain-text fallback
//! 3. **Repair** headers ([`processing::repair_columns`]) and stack multiple tables by column name
//! 4. **Normalize** cells ([`processing::normalize`]) into text, numbers, or absent values
//!
//! Finished datasets are handed to a [`processing::MergeCoordinator`]: the first one defines the
//! reference schema, later ones are merged if their column set matches and rejected (with a
//! [`processing::SchemaReport`]) otherwise.
//!
//! **File formats (detected by extension, case-insensitive):**
//!
//! - **Delimited**: `.csv`
//! - **Spreadsheet** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//! - **Document** (Cargo feature `pdf`, on by default): `.pdf`
//!
//! ## Quick example: load and merge several files
//!
//! ```no_run
//! use tabular_reconcile::execution::RunnerOptions;
//! use tabular_reconcile::pipeline::Pipeline;
//! use tabular_reconcile::processing::{MergeDecision, MergeUpdate};
//!
//! let mut pipeline = Pipeline::new(RunnerOptions::default());
//! pipeline.open_many(["jan.csv", "feb.csv", "mar.xlsx"]);
//!
//! for update in pipeline.run_until_idle() {
//!     match update {
//!         MergeUpdate::Decision(MergeDecision::Rejected(rejection)) => eprintln!("{rejection}"),
//!         MergeUpdate::LoadFailed { source, message } => eprintln!("{source}: {message}"),
//!         _ => {}
//!     }
//! }
//! if let Some(merged) = pipeline.coordinator().merged() {
//!     println!("rows={} columns={:?}", merged.row_count(), merged.columns());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: source detection and format-specific table extraction
//! - [`processing`]: column repair, normalization, schema comparison and merging
//! - [`execution`]: the background job runner, cancellation and job events
//! - [`pipeline`]: single-threaded driver tying the runner to the merge coordinator
//! - [`types`]: raw/normalized table types
//! - [`error`]: error types used across the pipeline

pub mod error;
pub mod execution;
pub mod ingestion;
pub mod pipeline;
pub mod processing;
pub mod types;

pub use error::{IngestionError, IngestionResult};
