//! In-memory table transformations and schema reconciliation.
//!
//! The processing layer operates on [`crate::types::RawTable`]s produced by extraction and the
//! [`crate::types::NormalizedDataset`]s they become:
//!
//! - [`repair_columns()`]: header cleanup (drop unnamed, join broken names, dedup)
//! - [`concat_aligned()`]: stack several tables, aligning columns by name
//! - [`normalize()`]: text canonicalization and numeric coercion
//! - [`compare_columns()`]: symmetric column-set diff
//! - [`MergeCoordinator`]: reference-schema validation and row-wise merging
//!
//! ## Example: repair → normalize → compare
//!
//! ```rust
//! use std::path::Path;
//!
//! use tabular_reconcile::processing::{compare_columns, normalize, repair_columns, NormalizeOptions};
//! use tabular_reconcile::types::{CellValue, RawTable};
//!
//! let raw = RawTable::from_strings(["Name", "None", "Qty "], [["  Ada ", "x", "3,5"]]);
//! let repaired = repair_columns(&raw);
//! let ds = normalize(Path::new("a.csv"), &repaired, &NormalizeOptions::default()).unwrap();
//!
//! assert_eq!(ds.columns(), ["Name", "Qty"]);
//! assert_eq!(ds.get(0, "Name"), Some(&CellValue::Text("ada".to_string())));
//! assert_eq!(ds.get(0, "Qty"), Some(&CellValue::Number(3.5)));
//!
//! let other = vec!["Name".to_string(), "Price".to_string()];
//! let report = compare_columns(ds.columns(), &other);
//! assert_eq!(report.left_only, ["Qty"]);
//! assert_eq!(report.right_only, ["Price"]);
//! ```

pub mod align;
pub mod merge;
pub mod normalize;
pub mod repair;
pub mod schema;

pub use align::concat_aligned;
pub use merge::{AcceptedSource, MergeCoordinator, MergeDecision, MergeRejection, MergeSession, MergeUpdate};
pub use normalize::{normalize, NormalizeOptions};
pub use repair::{repair_columns, repair_columns_with_report, DroppedColumn, RepairReport};
pub use schema::{compare_columns, SchemaComparator, SchemaReport};
