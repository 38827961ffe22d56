//! Header repair for raw tables.

use std::collections::HashSet;

use crate::types::RawTable;

/// Why a column was removed by [`repair_columns_with_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DroppedColumn {
    /// Header was missing, blank, or the literal `none`.
    Unnamed { index: usize, raw: Option<String> },
    /// A column with the same cleaned name appeared earlier.
    Duplicate { index: usize, name: String },
}

/// Columns removed during repair, in left-to-right order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub dropped: Vec<DroppedColumn>,
}

/// Clean a table's header. See [`repair_columns_with_report`].
pub fn repair_columns(table: &RawTable) -> RawTable {
    repair_columns_with_report(table).0
}

/// Clean a table's header and report what was dropped.
///
/// Line breaks inside a header become a single space and the name is trimmed. Columns whose
/// cleaned header is missing, empty, or `none` (any case) are dropped. Of duplicate names only
/// the first (leftmost) column survives; later duplicates are dropped with their values.
///
/// Never fails. A table reduced to zero columns is valid output.
pub fn repair_columns_with_report(table: &RawTable) -> (RawTable, RepairReport) {
    let mut report = RepairReport::default();
    let mut seen = HashSet::new();
    let mut keep: Vec<(usize, String)> = Vec::with_capacity(table.column_count());

    for (index, raw) in table.header.iter().enumerate() {
        let cleaned = raw.as_deref().map(clean_header);
        match cleaned {
            Some(name) if !name.is_empty() && !name.eq_ignore_ascii_case("none") => {
                if seen.insert(name.clone()) {
                    keep.push((index, name));
                } else {
                    report.dropped.push(DroppedColumn::Duplicate { index, name });
                }
            }
            _ => report.dropped.push(DroppedColumn::Unnamed {
                index,
                raw: raw.clone(),
            }),
        }
    }

    let header = keep.iter().map(|(_, name)| Some(name.clone())).collect();
    let rows = table
        .rows
        .iter()
        .map(|row| keep.iter().map(|(i, _)| row.get(*i).cloned().flatten()).collect())
        .collect();

    (RawTable { header, rows }, report)
}

fn clean_header(raw: &str) -> String {
    raw.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{repair_columns, repair_columns_with_report, DroppedColumn};
    use crate::types::RawTable;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn drops_none_column_and_trims() {
        let table = RawTable::from_strings(["Name", "None", "Qty "], [["ada", "x", "1"]]);
        let repaired = repair_columns(&table);
        assert_eq!(repaired.header, vec![s("Name"), s("Qty")]);
        assert_eq!(repaired.rows[0], vec![s("ada"), s("1")]);
    }

    #[test]
    fn joins_broken_headers() {
        let table = RawTable::from_strings(["Unit\nPrice", "Total\r\nDue"], [["1", "2"]]);
        let repaired = repair_columns(&table);
        assert_eq!(repaired.header, vec![s("Unit Price"), s("Total Due")]);
    }

    #[test]
    fn keeps_first_duplicate_with_its_values() {
        let table = RawTable::from_strings(["id", "id ", "NONE", "id"], [["1", "2", "3", "4"]]);
        let (repaired, report) = repair_columns_with_report(&table);
        assert_eq!(repaired.header, vec![s("id")]);
        assert_eq!(repaired.rows[0], vec![s("1")]);
        assert_eq!(
            report.dropped,
            vec![
                DroppedColumn::Duplicate { index: 1, name: "id".to_string() },
                DroppedColumn::Unnamed { index: 2, raw: s("NONE") },
                DroppedColumn::Duplicate { index: 3, name: "id".to_string() },
            ]
        );
    }

    #[test]
    fn null_and_blank_headers_are_dropped() {
        let table = RawTable::new(vec![None, s("  "), s("a")], vec![vec![s("1"), s("2"), s("3")]]);
        let repaired = repair_columns(&table);
        assert_eq!(repaired.header, vec![s("a")]);
        assert_eq!(repaired.rows[0], vec![s("3")]);
    }

    #[test]
    fn all_columns_dropped_is_valid() {
        let table = RawTable::from_strings(["none", ""], [["1", "2"]]);
        let repaired = repair_columns(&table);
        assert_eq!(repaired.column_count(), 0);
        assert_eq!(repaired.row_count(), 1);
    }
}
