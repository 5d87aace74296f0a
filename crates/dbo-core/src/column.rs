//! Physical column descriptions.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ColumnType;

/// One physical column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name in the data source.
    pub name: String,
    /// Semantic type tag.
    pub column_type: ColumnType,
    /// Maximum length, for text columns.
    pub length: Option<usize>,
    /// Whether the column must hold a value.
    pub required: bool,
    /// Whether this is the primary key column.
    pub primary_key: bool,
}

impl Column {
    /// Create a new optional column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            length: None,
            required: false,
            primary_key: false,
        }
    }

    /// Set the maximum length.
    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Set the maximum length from optional.
    pub fn length_opt(mut self, length: Option<usize>) -> Self {
        self.length = length;
        self
    }

    /// Set the required flag.
    pub fn required(mut self, value: bool) -> Self {
        self.required = value;
        self
    }

    /// Mark as the primary key. Primary keys are always required.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.required = true;
        self
    }
}

/// An ordered collection of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    /// Table the columns belong to, used in diagnostics.
    table: String,
    columns: Vec<Column>,
}

impl ColumnSet {
    /// Create an empty set for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Create a set from columns.
    pub fn from_columns(table: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    /// Table name this set describes.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Append a column. A column with the same name is replaced in place.
    pub fn push(&mut self, column: Column) {
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == column.name) {
            *existing = column;
        } else {
            self.columns.push(column);
        }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    /// Column names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Optional lookup by name.
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// True if a column named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Lookup by name, failing with the list of available columns.
    pub fn column_named(&self, name: &str) -> Result<&Column> {
        self.get(name).ok_or_else(|| Error::UnknownColumn {
            table: self.table.clone(),
            name: name.to_string(),
            available: self.columns.iter().map(|c| c.name.clone()).collect(),
        })
    }

    /// The primary key column, if one is marked.
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discs() -> ColumnSet {
        let mut set = ColumnSet::new("discs");
        set.push(Column::new("id", ColumnType::Int).primary_key());
        set.push(Column::new("name", ColumnType::Text).length(64).required(true));
        set.push(Column::new("year", ColumnType::Numeric));
        set
    }

    #[test]
    fn test_lookup_by_name() {
        let set = discs();
        assert_eq!(set.column_named("name").unwrap().length, Some(64));
        assert_eq!(set.primary_key().map(|c| c.name.as_str()), Some("id"));
        assert_eq!(set.names(), vec!["id", "name", "year"]);
    }

    #[test]
    fn test_missing_column_names_available() {
        let set = discs();
        let err = set.column_named("title").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("title"));
        assert!(msg.contains("id, name, year"));
    }

    #[test]
    fn test_push_replaces_same_name() {
        let mut set = discs();
        set.push(Column::new("year", ColumnType::Int));
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("year").unwrap().column_type, ColumnType::Int);
    }
}
