//! Delimited-text extraction.

use std::fs::File;
use std::path::Path;

use crate::error::{IngestionError, IngestionResult};
use crate::types::RawTable;

/// Read a CSV file into a single [`RawTable`].
///
/// Rules:
///
/// - The first record is the header; remaining records are data rows.
/// - Every cell is kept as text (no numeric coercion here); empty fields become `None`.
/// - Records may differ in width; short rows are padded, extra cells land in unnamed columns.
///
/// A missing or unopenable file fails with [`IngestionError::SourceUnreadable`].
pub fn extract_csv_from_path(path: impl AsRef<Path>) -> IngestionResult<RawTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IngestionError::unreadable(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    extract_csv_from_reader(&mut rdr)
}

/// Extract a [`RawTable`] from an existing CSV reader.
///
/// The reader should be built with `has_headers(false)`; the first record is taken as the header.
pub fn extract_csv_from_reader<R: std::io::Read>(rdr: &mut csv::Reader<R>) -> IngestionResult<RawTable> {
    let mut records = rdr.records();

    let header = match records.next() {
        Some(first) => first?.iter().map(cell).collect(),
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result?;
        rows.push(record.iter().map(cell).collect());
    }

    Ok(RawTable::new(header, rows))
}

fn cell(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_owned())
    }
}
