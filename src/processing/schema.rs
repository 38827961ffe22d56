//! Column-set comparison between two datasets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::NormalizedDataset;

/// Symmetric difference of two column-name sets.
///
/// The three name lists are disjoint and sorted alphabetically. `left_columns`/`right_columns`
/// keep the original orderings for display. `collisions` lists match keys carried by more than one
/// column on the same side (e.g. `A` and `a` under a case-insensitive comparator); such a report is
/// never equal, since the columns cannot be aligned one to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub left_only: Vec<String>,
    pub right_only: Vec<String>,
    pub common: Vec<String>,
    pub left_columns: Vec<String>,
    pub right_columns: Vec<String>,
    #[serde(default)]
    pub collisions: Vec<String>,
}

impl SchemaReport {
    /// True when both sides have the same column set.
    pub fn is_equal(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty() && self.collisions.is_empty()
    }

    /// The same report with left and right exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            left_only: self.right_only.clone(),
            right_only: self.left_only.clone(),
            common: self.common.clone(),
            left_columns: self.right_columns.clone(),
            right_columns: self.left_columns.clone(),
            collisions: self.collisions.clone(),
        }
    }

    /// Columns the right side lacks, when the left side is the reference.
    pub fn missing(&self) -> &[String] {
        &self.left_only
    }

    /// Columns only the right side has, when the left side is the reference.
    pub fn extra(&self) -> &[String] {
        &self.right_only
    }
}

/// Compares column-name sets. Case-sensitive by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaComparator {
    pub case_sensitive: bool,
}

impl Default for SchemaComparator {
    fn default() -> Self {
        Self { case_sensitive: true }
    }
}

impl SchemaComparator {
    pub fn case_insensitive() -> Self {
        Self { case_sensitive: false }
    }

    /// Key used to match column names.
    pub fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    pub fn compare(&self, left: &NormalizedDataset, right: &NormalizedDataset) -> SchemaReport {
        self.compare_columns(left.columns(), right.columns())
    }

    pub fn compare_columns(&self, left: &[String], right: &[String]) -> SchemaReport {
        let l: BTreeSet<String> = left.iter().map(|c| self.key(c)).collect();
        let r: BTreeSet<String> = right.iter().map(|c| self.key(c)).collect();

        let mut collisions = self.repeated_keys(left);
        collisions.extend(self.repeated_keys(right));

        SchemaReport {
            left_only: l.difference(&r).cloned().collect(),
            right_only: r.difference(&l).cloned().collect(),
            common: l.intersection(&r).cloned().collect(),
            left_columns: left.to_vec(),
            right_columns: right.to_vec(),
            collisions: collisions.into_iter().collect(),
        }
    }

    fn repeated_keys(&self, columns: &[String]) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        columns
            .iter()
            .map(|c| self.key(c))
            .filter(|k| !seen.insert(k.clone()))
            .collect()
    }
}

/// Case-sensitive comparison of two column lists.
pub fn compare_columns(left: &[String], right: &[String]) -> SchemaReport {
    SchemaComparator::default().compare_columns(left, right)
}

#[cfg(test)]
mod tests {
    use super::{compare_columns, SchemaComparator};

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reports_sorted_disjoint_lists() {
        let report = compare_columns(&cols(&["qty", "name", "b"]), &cols(&["name", "price", "a"]));
        assert_eq!(report.left_only, cols(&["b", "qty"]));
        assert_eq!(report.right_only, cols(&["a", "price"]));
        assert_eq!(report.common, cols(&["name"]));
        assert_eq!(report.left_columns, cols(&["qty", "name", "b"]));
        assert!(!report.is_equal());
    }

    #[test]
    fn order_does_not_matter_for_equality() {
        assert!(compare_columns(&cols(&["a", "b"]), &cols(&["b", "a"])).is_equal());
    }

    #[test]
    fn case_sensitivity_is_configurable() {
        let l = cols(&["Name"]);
        let r = cols(&["name"]);
        assert!(!compare_columns(&l, &r).is_equal());
        assert!(SchemaComparator::case_insensitive().compare_columns(&l, &r).is_equal());
    }

    #[test]
    fn folded_name_collisions_are_never_equal() {
        let ci = SchemaComparator::case_insensitive();
        let report = ci.compare_columns(&cols(&["A", "a"]), &cols(&["a"]));
        assert!(report.left_only.is_empty() && report.right_only.is_empty());
        assert_eq!(report.collisions, cols(&["a"]));
        assert!(!report.is_equal());

        assert!(!ci.compare_columns(&cols(&["A", "a"]), &cols(&["a", "A"])).is_equal());
        assert!(compare_columns(&cols(&["A", "a"]), &cols(&["a", "A"])).is_equal());
    }

    #[test]
    fn swapped_matches_reversed_arguments() {
        let l = cols(&["a", "b"]);
        let r = cols(&["b", "c"]);
        assert_eq!(compare_columns(&l, &r).swapped(), compare_columns(&r, &l));
    }
}
