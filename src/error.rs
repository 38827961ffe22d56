use std::path::{Path, PathBuf};

use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by every stage of the ingestion pipeline.
///
/// A single enum shared by extraction, repair, normalization and the job runner. Each variant is
/// terminal for the job that produced it and never touches other jobs or the merge session.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The path is missing or cannot be opened/read.
    #[error("cannot read source '{}': {message}", path.display())]
    SourceUnreadable { path: PathBuf, message: String },

    /// The file extension does not map to a known source kind.
    #[error("unsupported format '{extension}' for source '{}'", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// A document produced neither structural tables nor text on any page.
    #[error("no tables or text could be extracted from '{}'", path.display())]
    NoExtractableContent { path: PathBuf },

    /// Column repair left no columns and the caller requires a non-empty schema.
    #[error("table from '{}' has no usable columns", path.display())]
    EmptyTable { path: PathBuf },

    /// A table-extraction capability was compiled out.
    #[error("{capability} extraction is not available (enable cargo feature '{feature}')")]
    DependencyMissing {
        capability: &'static str,
        feature: &'static str,
    },

    /// The requested sheet does not exist in the workbook.
    #[error("sheet {sheet} not found in '{}'", path.display())]
    SheetNotFound { path: PathBuf, sheet: String },

    /// A column selection named columns the dataset does not have.
    #[error("columns not found: {}", columns.join(", "))]
    UnknownColumns { columns: Vec<String> },

    /// The job's worker panicked before producing an outcome.
    #[error("ingestion of '{}' panicked: {message}", path.display())]
    Panicked { path: PathBuf, message: String },

    /// Malformed delimited input.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "excel")]
    /// Workbook parsing error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),
}

impl IngestionError {
    pub(crate) fn unreadable(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::SourceUnreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// File name of the offending source, when the error carries one.
    pub fn source_name(&self) -> Option<String> {
        let path = match self {
            Self::SourceUnreadable { path, .. }
            | Self::UnsupportedFormat { path, .. }
            | Self::NoExtractableContent { path }
            | Self::EmptyTable { path }
            | Self::SheetNotFound { path, .. }
            | Self::Panicked { path, .. } => path,
            _ => return None,
        };
        Some(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        )
    }
}
