//! Source detection and table extraction.
//!
//! Most callers should use [`extract_tables`] (from [`unified`]) which:
//!
//! - dispatches on the [`crate::types::SourceKind`] detected by [`detect`]
//! - returns the raw tables found in the source, header assigned but not yet repaired
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`excel`] (feature `excel`)
//! - [`pdf`] (loader behind feature `pdf`; the table heuristics are always available)

pub mod csv;
pub mod detect;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;
pub mod pdf;
pub mod unified;

pub use detect::detect_source_kind;
pub use observability::{
    severity_for_error, CompositeObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    TracingObserver,
};
pub use unified::{extract_tables, ExtractOptions, SheetSelector};
