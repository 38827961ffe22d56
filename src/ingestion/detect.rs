//! Source kind detection from file extensions.

use std::path::Path;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{SourceDocument, SourceKind};

impl SourceKind {
    /// Map a file extension (case-insensitive, without the dot) to a source kind.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Self::Delimited,
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Self::Spreadsheet,
            "pdf" => Self::Document,
            _ => Self::Unknown,
        }
    }
}

/// Detect the source kind of `path` from its extension. Performs no I/O.
pub fn detect_source_kind(path: impl AsRef<Path>) -> SourceKind {
    path.as_ref()
        .extension()
        .and_then(|s| s.to_str())
        .map(SourceKind::from_extension)
        .unwrap_or(SourceKind::Unknown)
}

impl SourceDocument {
    /// Detect the kind of `path`, failing with [`IngestionError::UnsupportedFormat`] if unknown.
    pub fn detect(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let path = path.as_ref();
        match detect_source_kind(path) {
            SourceKind::Unknown => Err(IngestionError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: path
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            }),
            kind => Ok(Self::new(path.to_path_buf(), kind)),
        }
    }
}
