//! In-memory reference implementation of [`DataSource`].
//!
//! Used by the test suites and handy for embedding. It enforces the parts of
//! the contract a SQL backend would: unknown tables and columns are errors,
//! NOT NULL columns reject missing values, and sequence columns are assigned
//! on insert.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::column::ColumnSet;
use crate::criteria::{Aggregate, Criteria, OrderBy};
use crate::error::{Error, Result};
use crate::source::{DataSource, Row};
use crate::value::Value;

#[derive(Debug)]
struct MemTable {
    columns: ColumnSet,
    rows: Vec<Row>,
    next_id: i64,
}

/// Counters of write requests received, for assertions in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// `insert` calls.
    pub inserts: usize,
    /// `update` calls.
    pub updates: usize,
    /// `delete` calls.
    pub deletes: usize,
    /// `select_rows` and `select_one_value` calls.
    pub selects: usize,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, MemTable>,
    stats: MemoryStats,
}

/// A data source holding every table in process memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    state: Mutex<State>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the request counters.
    pub fn stats(&self) -> MemoryStats {
        self.state().stats
    }

    /// Number of rows currently stored in `table` (0 if it does not exist).
    pub fn row_count(&self, table: &str) -> usize {
        self.state().tables.get(table).map_or(0, |t| t.rows.len())
    }
}

fn missing_table(table: &str) -> Error {
    Error::data_source(table, "no such table")
}

fn check_columns(table: &str, set: &ColumnSet, columns: &[String]) -> Result<()> {
    for name in columns {
        if !set.contains(name) {
            return Err(Error::data_source(
                table,
                format!("no such column: {name}"),
            ));
        }
    }
    Ok(())
}

fn check_required(table: &str, set: &ColumnSet, row: &Row) -> Result<()> {
    for col in set.iter().filter(|c| c.required && !c.primary_key) {
        if row.get(&col.name).is_none_or(Value::is_null) {
            return Err(Error::data_source(
                table,
                format!("NOT NULL constraint failed: {}.{}", table, col.name),
            ));
        }
    }
    Ok(())
}

impl DataSource for MemorySource {
    fn insert(
        &self,
        table: &str,
        columns: &[String],
        values: &[Value],
        sequence_column: Option<&str>,
    ) -> Result<Option<Value>> {
        let mut state = self.state();
        state.stats.inserts += 1;
        let mem = state.tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        check_columns(table, &mem.columns, columns)?;

        let mut row: Row = columns.iter().cloned().zip(values.iter().cloned()).collect();

        let mut assigned = None;
        if let Some(seq) = sequence_column {
            let current = row.get(seq).cloned().unwrap_or_default();
            let id = if current.is_empty() {
                let id = mem.next_id;
                mem.next_id += 1;
                row.insert(seq.to_string(), Value::Int(id));
                Value::Int(id)
            } else {
                if let Some(n) = current.as_i64() {
                    mem.next_id = mem.next_id.max(n + 1);
                }
                current
            };
            if mem
                .rows
                .iter()
                .any(|r| r.get(seq).is_some_and(|v| v.matches(&id)))
            {
                return Err(Error::data_source(
                    table,
                    format!("UNIQUE constraint failed: {table}.{seq} = {id}"),
                ));
            }
            assigned = Some(id);
        }

        check_required(table, &mem.columns, &row)?;
        tracing::debug!(table = %table, columns = columns.len(), "memory insert");
        mem.rows.push(row);
        Ok(assigned)
    }

    fn update(
        &self,
        table: &str,
        columns: &[String],
        values: &[Value],
        criteria: &Criteria,
    ) -> Result<usize> {
        let mut state = self.state();
        state.stats.updates += 1;
        let mem = state.tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        check_columns(table, &mem.columns, columns)?;

        // Stage every change first so a rejected row leaves the table untouched.
        let mut staged = Vec::new();
        for (index, row) in mem.rows.iter().enumerate().filter(|(_, r)| criteria.matches(r)) {
            let mut updated = row.clone();
            for (col, value) in columns.iter().zip(values) {
                updated.insert(col.clone(), value.clone());
            }
            check_required(table, &mem.columns, &updated)?;
            staged.push((index, updated));
        }
        let touched = staged.len();
        for (index, updated) in staged {
            mem.rows[index] = updated;
        }
        tracing::debug!(table = %table, criteria = %criteria, touched, "memory update");
        Ok(touched)
    }

    fn delete(&self, table: &str, criteria: &Criteria) -> Result<usize> {
        let mut state = self.state();
        state.stats.deletes += 1;
        let mem = state.tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let before = mem.rows.len();
        mem.rows.retain(|r| !criteria.matches(r));
        let removed = before - mem.rows.len();
        tracing::debug!(table = %table, criteria = %criteria, removed, "memory delete");
        Ok(removed)
    }

    fn select_rows(
        &self,
        table: &str,
        columns: Option<&[String]>,
        criteria: &Criteria,
        order: &[OrderBy],
    ) -> Result<Vec<Row>> {
        let mut state = self.state();
        state.stats.selects += 1;
        let mem = state.tables.get(table).ok_or_else(|| missing_table(table))?;
        if let Some(cols) = columns {
            check_columns(table, &mem.columns, cols)?;
        }

        let mut rows: Vec<Row> = mem
            .rows
            .iter()
            .filter(|r| criteria.matches(r))
            .cloned()
            .collect();

        if !order.is_empty() {
            rows.sort_by(|a, b| {
                for term in order {
                    let x = a.get(&term.column).unwrap_or(&Value::Null);
                    let y = b.get(&term.column).unwrap_or(&Value::Null);
                    let ord = if term.descending {
                        y.sort_cmp(x)
                    } else {
                        x.sort_cmp(y)
                    };
                    if ord.is_ne() {
                        return ord;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        if let Some(cols) = columns {
            for row in &mut rows {
                row.retain(|k, _| cols.contains(k));
            }
        }
        Ok(rows)
    }

    fn select_one_value(
        &self,
        table: &str,
        aggregate: &Aggregate,
        criteria: &Criteria,
    ) -> Result<Value> {
        let mut state = self.state();
        state.stats.selects += 1;
        let mem = state.tables.get(table).ok_or_else(|| missing_table(table))?;
        let matching = mem.rows.iter().filter(|r| criteria.matches(r));
        match aggregate {
            Aggregate::Count => Ok(Value::from(matching.count())),
            Aggregate::Max(col) => {
                check_columns(table, &mem.columns, std::slice::from_ref(col))?;
                Ok(matching
                    .filter_map(|r| r.get(col))
                    .filter(|v| !v.is_null())
                    .max_by(|a, b| a.sort_cmp(b))
                    .cloned()
                    .unwrap_or_default())
            }
        }
    }

    fn introspect_columns(&self, table: &str) -> Result<ColumnSet> {
        self.state()
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| missing_table(table))
    }

    fn create_table(&self, table: &str, columns: &ColumnSet) -> Result<()> {
        let mut state = self.state();
        if state.tables.contains_key(table) {
            return Err(Error::data_source(table, "table already exists"));
        }
        let mut set = ColumnSet::new(table);
        for col in columns {
            set.push(col.clone());
        }
        tracing::debug!(table = %table, columns = set.len(), "memory create table");
        state.tables.insert(
            table.to_string(),
            MemTable {
                columns: set,
                rows: Vec::new(),
                next_id: 1,
            },
        );
        Ok(())
    }

    fn drop_table(&self, table: &str) -> Result<()> {
        self.state()
            .tables
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| missing_table(table))
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.state().tables.contains_key(table))
    }
}
