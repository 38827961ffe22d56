//! Stacking several repaired tables into one.

use std::collections::HashMap;

use crate::types::RawTable;

/// Concatenate header-clean tables row-wise, aligning columns by name.
///
/// The result's columns are the union of all headers in first-seen order. Rows keep their
/// table order; a column missing from a table is filled with `None` for that table's rows.
pub fn concat_aligned(tables: &[RawTable]) -> RawTable {
    if let [single] = tables {
        return single.clone();
    }

    let mut header: Vec<Option<String>> = Vec::new();
    let mut position: HashMap<Option<String>, usize> = HashMap::new();
    for name in tables.iter().flat_map(|t| t.header.iter()) {
        if !position.contains_key(name) {
            position.insert(name.clone(), header.len());
            header.push(name.clone());
        }
    }

    let total = tables.iter().map(RawTable::row_count).sum();
    let mut rows = Vec::with_capacity(total);
    for table in tables {
        let targets: Vec<usize> = table.header.iter().map(|h| position[h]).collect();
        for row in &table.rows {
            let mut out = vec![None; header.len()];
            for (cell, &target) in row.iter().zip(&targets) {
                out[target] = cell.clone();
            }
            rows.push(out);
        }
    }

    RawTable { header, rows }
}

#[cfg(test)]
mod tests {
    use super::concat_aligned;
    use crate::types::RawTable;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn unions_columns_in_first_seen_order() {
        let a = RawTable::from_strings(["name", "qty"], [["ada", "1"]]);
        let b = RawTable::from_strings(["qty", "price"], [["2", "9,5"]]);
        let merged = concat_aligned(&[a, b]);
        assert_eq!(merged.header, vec![s("name"), s("qty"), s("price")]);
        assert_eq!(merged.rows[0], vec![s("ada"), s("1"), None]);
        assert_eq!(merged.rows[1], vec![None, s("2"), s("9,5")]);
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let merged = concat_aligned(&[]);
        assert_eq!(merged.column_count(), 0);
        assert_eq!(merged.row_count(), 0);
    }
}
