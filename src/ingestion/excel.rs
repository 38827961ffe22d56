#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{IngestionError, IngestionResult};
use crate::types::RawTable;

use super::unified::SheetSelector;

/// Read one sheet of a workbook (`.xlsx`, `.xls`, `.ods`, etc.) into a [`RawTable`].
///
/// Behavior:
/// - [`SheetSelector::First`] picks the first sheet in declaration order
/// - The first non-empty row becomes the header row
/// - Every cell is rendered as text; empty cells become `None`
///
/// A workbook that cannot be opened (missing, unreadable, not a workbook) is
/// [`IngestionError::SourceUnreadable`]; a sheet that fails to parse is [`IngestionError::Excel`].
pub fn extract_excel_from_path(path: impl AsRef<Path>, sheet: &SheetSelector) -> IngestionResult<RawTable> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path).map_err(|e| IngestionError::unreadable(path, e))?;

    let names = workbook.sheet_names();
    let name = match sheet {
        SheetSelector::First => names.first().cloned(),
        SheetSelector::Index(idx) => names.get(*idx).cloned(),
        SheetSelector::Name(name) => names.iter().find(|n| *n == name).cloned(),
    }
    .ok_or_else(|| IngestionError::SheetNotFound {
        path: path.to_path_buf(),
        sheet: sheet.to_string(),
    })?;

    let range = workbook.worksheet_range(&name)?;
    Ok(range_to_table(&range))
}

fn range_to_table(range: &calamine::Range<Data>) -> RawTable {
    let mut rows = range
        .rows()
        .skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)))
        .map(|row| row.iter().map(cell_to_text).collect::<Vec<_>>());

    let header = rows.next().unwrap_or_default();
    RawTable::new(header, rows.collect())
}

fn cell_to_text(c: &Data) -> Option<String> {
    let text = match c {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("{e:?}"),
        other => other.to_string(),
    };
    if text.trim().is_empty() { None } else { Some(text) }
}
