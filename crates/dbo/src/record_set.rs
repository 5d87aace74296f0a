//! Materialized query results.

use dbo_core::Value;

use crate::record::Record;

/// Records in retrieval order. Fully loaded; iterate as often as needed.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Wrap already-fetched records.
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate in retrieval order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Iterate mutably in retrieval order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        self.records.iter_mut()
    }

    /// The record at `index`.
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// The first record.
    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    /// Primary keys in retrieval order.
    pub fn ids(&self) -> Vec<Value> {
        self.records.iter().filter_map(|r| r.id().cloned()).collect()
    }

    /// Unwrap into the records.
    pub fn into_vec(self) -> Vec<Record> {
        self.records
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
