//! Core data model types for the pipeline.
//!
//! Extraction produces [`RawTable`]s (text cells, header assigned but not yet cleaned). Repair and
//! normalization turn them into a [`NormalizedDataset`], whose cells are typed [`CellValue`]s.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};

/// A single typed value in a [`NormalizedDataset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Missing/empty value, or a value that failed numeric coercion.
    Absent,
    /// Canonicalized text.
    Text(String),
    /// Finite 64-bit float.
    Number(f64),
}

impl CellValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Render the value back to cell text. `Absent` renders as `None`.
    pub fn to_cell_text(&self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Kind of tabular source, decided from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Delimited text (`.csv`).
    Delimited,
    /// Spreadsheet/workbook (`.xlsx`, `.xls`, ...).
    Spreadsheet,
    /// Document with embedded tables (`.pdf`).
    Document,
    /// Anything else.
    Unknown,
}

/// A source path together with its detected kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    path: PathBuf,
    kind: SourceKind,
}

impl SourceDocument {
    pub(crate) fn new(path: PathBuf, kind: SourceKind) -> Self {
        Self { path, kind }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// File name used when reporting on this source.
    pub fn name(&self) -> String {
        source_name(&self.path)
    }
}

pub(crate) fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extracted, unrepaired table: a header plus rows of optional cell text.
///
/// Rows are kept at exactly `header.len()` cells; [`RawTable::new`] pads short rows with `None`
/// and widens the header with unnamed (`None`) columns when a row is longer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column headers; `None` marks an unnamed column.
    pub header: Vec<Option<String>>,
    /// Row-major cell storage.
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(mut header: Vec<Option<String>>, mut rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(header.len());
        header.resize(width, None);
        for row in &mut rows {
            row.resize(width, None);
        }
        Self { header, rows }
    }

    /// Build a table from string headers and rows (all cells present).
    pub fn from_strings<H, R, C>(header: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self::new(
            header.into_iter().map(|h| Some(h.into())).collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(|c| Some(c.into())).collect())
                .collect(),
        )
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Fully cleaned, column-typed result of the pipeline.
///
/// Invariant: column names are non-empty and unique, and every row holds exactly one value per
/// column (in column order).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl NormalizedDataset {
    /// Create a dataset from columns and rows.
    ///
    /// # Panics
    ///
    /// Panics if a row's length differs from the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        for row in &rows {
            assert!(
                row.len() == columns.len(),
                "row length {} does not match column count {}",
                row.len(),
                columns.len()
            );
        }
        Self { columns, rows }
    }

    /// Empty dataset with the given columns.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Value at `(row, column)`.
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.index_of(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Iterate a column's values top to bottom.
    pub fn column_values<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a CellValue>> {
        let idx = self.index_of(column)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// A new dataset holding only `columns`, in the requested order.
    ///
    /// Repeated names are kept once. Fails with [`IngestionError::UnknownColumns`] naming every
    /// requested column that does not exist; `self` is never modified.
    pub fn select_columns<S: AsRef<str>>(&self, columns: &[S]) -> IngestionResult<Self> {
        let names: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
        let missing: Vec<String> = names
            .iter()
            .filter(|c| self.index_of(c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(IngestionError::UnknownColumns { columns: missing });
        }

        let mut picked: Vec<(usize, String)> = Vec::with_capacity(names.len());
        for name in names {
            if !picked.iter().any(|(_, p)| p == name) {
                if let Some(idx) = self.index_of(name) {
                    picked.push((idx, name.to_string()));
                }
            }
        }

        let rows = self
            .rows
            .iter()
            .map(|row| picked.iter().map(|(i, _)| row[*i].clone()).collect())
            .collect();
        Ok(Self {
            columns: picked.into_iter().map(|(_, name)| name).collect(),
            rows,
        })
    }

    /// Render the dataset back into a [`RawTable`], as if it were re-ingested.
    pub fn to_raw_table(&self) -> RawTable {
        RawTable {
            header: self.columns.iter().cloned().map(Some).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| r.iter().map(CellValue::to_cell_text).collect())
                .collect(),
        }
    }
}
