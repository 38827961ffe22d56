//! Per-column text canonicalization and numeric coercion.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{CellValue, NormalizedDataset, RawTable};

/// Options for [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Fail with [`IngestionError::EmptyTable`] when the table has no columns.
    ///
    /// Leave unset for diagnostic loads that tolerate an empty schema.
    pub require_columns: bool,
}

/// Trim, collapse internal whitespace runs to one space, and lowercase.
///
/// Returns `None` when nothing is left.
pub fn canonicalize_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.to_lowercase())
    }
}

/// Parse `text` as a number after replacing every `,` with `.`.
///
/// Thousands separators are not understood: `"1.234,56"` becomes `"1.234.56"` and fails.
/// Non-finite results (`nan`, `inf`) are rejected.
pub fn coerce_number(text: &str) -> Option<f64> {
    text.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Normalize a header-clean [`RawTable`] into a [`NormalizedDataset`].
///
/// Each column is handled on its own. Values are canonicalized with [`canonicalize_text`]; a
/// column is numeric when strictly more than half of its present values pass [`coerce_number`].
/// In a numeric column, values that fail coercion become [`CellValue::Absent`] instead of erroring.
///
/// Rows shorter than the header read as absent in the missing columns; cells past the header are
/// ignored. `source` is only used to label an [`IngestionError::EmptyTable`] error.
pub fn normalize(source: &Path, table: &RawTable, options: &NormalizeOptions) -> IngestionResult<NormalizedDataset> {
    if table.column_count() == 0 && options.require_columns {
        return Err(IngestionError::EmptyTable {
            path: source.to_path_buf(),
        });
    }

    let columns: Vec<String> = table
        .header
        .iter()
        .enumerate()
        .map(|(i, h)| h.clone().unwrap_or_else(|| i.to_string()))
        .collect();

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::with_capacity(columns.len()); table.row_count()];
    for col in 0..columns.len() {
        let canonical: Vec<Option<String>> = table
            .rows
            .iter()
            .map(|r| r.get(col).and_then(|c| c.as_deref()).and_then(canonicalize_text))
            .collect();

        let present = canonical.iter().flatten().count();
        let numeric = canonical
            .iter()
            .flatten()
            .filter(|v| coerce_number(v).is_some())
            .count();
        let is_numeric = numeric * 2 > present;

        for (row, value) in rows.iter_mut().zip(canonical) {
            row.push(match value {
                None => CellValue::Absent,
                Some(v) if is_numeric => coerce_number(&v).map_or(CellValue::Absent, CellValue::Number),
                Some(v) => CellValue::Text(v),
            });
        }
    }

    Ok(NormalizedDataset::new(columns, rows))
}
