//! Semantic column type tags.

use serde::{Deserialize, Serialize};

/// The semantic type of a physical column.
///
/// The data source decides how each tag maps onto its dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Variable-length text.
    #[default]
    Text,
    /// Integer.
    Int,
    /// Arbitrary numeric (integer or decimal).
    Numeric,
    /// Point in time (stored as Unix seconds).
    Timestamp,
    /// Boolean.
    Bool,
}
