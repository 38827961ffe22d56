//! Unified extraction entrypoint.
//!
//! Most callers should use [`extract_tables`], which dispatches on the
//! [`crate::types::SourceKind`] of a detected [`SourceDocument`] and returns the raw tables found
//! in the source.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{RawTable, SourceDocument, SourceKind};

use super::csv;

/// Which sheet to read from a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SheetSelector {
    /// The first sheet in declaration order (default).
    #[default]
    First,
    /// A sheet by name.
    Name(String),
    /// A sheet by 0-based position.
    Index(usize),
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("#0"),
            Self::Name(name) => write!(f, "'{name}'"),
            Self::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

/// Options controlling extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Spreadsheet-specific sheet choice.
    pub sheet: SheetSelector,
}

/// Extract the raw tables of `source`.
///
/// - Delimited and spreadsheet sources yield exactly one table.
/// - Document sources yield one table per detected page table, or the text fallback table.
/// - Unknown sources fail with [`IngestionError::UnsupportedFormat`].
/// - Kinds whose loader was compiled out fail with [`IngestionError::DependencyMissing`].
///
/// # Examples
///
/// ```no_run
/// use tabular_reconcile::ingestion::{extract_tables, ExtractOptions};
/// use tabular_reconcile::types::SourceDocument;
///
/// # fn main() -> Result<(), tabular_reconcile::IngestionError> {
/// let doc = SourceDocument::detect("sales.csv")?;
/// let tables = extract_tables(&doc, &ExtractOptions::default())?;
/// println!("tables={}", tables.len());
/// # Ok(())
/// # }
/// ```
pub fn extract_tables(source: &SourceDocument, options: &ExtractOptions) -> IngestionResult<Vec<RawTable>> {
    match source.kind() {
        SourceKind::Delimited => csv::extract_csv_from_path(source.path()).map(|t| vec![t]),
        SourceKind::Spreadsheet => extract_excel_dispatch(source, &options.sheet).map(|t| vec![t]),
        SourceKind::Document => extract_pdf_dispatch(source),
        SourceKind::Unknown => Err(IngestionError::UnsupportedFormat {
            path: source.path().to_path_buf(),
            extension: source
                .path()
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }),
    }
}

fn extract_excel_dispatch(source: &SourceDocument, sheet: &SheetSelector) -> IngestionResult<RawTable> {
    // Avoid unused warnings when the feature is off.
    let _ = (source, sheet);

    #[cfg(feature = "excel")]
    {
        super::excel::extract_excel_from_path(source.path(), sheet)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(IngestionError::DependencyMissing {
            capability: "spreadsheet",
            feature: "excel",
        })
    }
}

fn extract_pdf_dispatch(source: &SourceDocument) -> IngestionResult<Vec<RawTable>> {
    let _ = source;

    #[cfg(feature = "pdf")]
    {
        super::pdf::extract_pdf_from_path(source.path())
    }

    #[cfg(not(feature = "pdf"))]
    {
        Err(IngestionError::DependencyMissing {
            capability: "pdf table",
            feature: "pdf",
        })
    }
}
