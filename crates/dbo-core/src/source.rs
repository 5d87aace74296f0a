//! The data-source contract consumed by tables.
//!
//! A `DataSource` is the only component that talks to storage. It owns
//! dialect, parameterization and sequence assignment; the engine only hands it
//! table names, column lists, values and structured [`Criteria`].

use std::collections::BTreeMap;

use crate::column::ColumnSet;
use crate::criteria::{Aggregate, Criteria, OrderBy};
use crate::error::Result;
use crate::value::Value;

/// A row as exchanged with the data source: column name → value.
pub type Row = BTreeMap<String, Value>;

/// Abstract storage collaborator.
///
/// Implementations are shared between every table bound to them, so all
/// methods take `&self`.
pub trait DataSource: Send + Sync {
    /// Insert one row.
    ///
    /// When `sequence_column` names a column whose value is NULL, the source
    /// assigns the next key and returns it.
    fn insert(
        &self,
        table: &str,
        columns: &[String],
        values: &[Value],
        sequence_column: Option<&str>,
    ) -> Result<Option<Value>>;

    /// Update every row matching `criteria`. Returns the affected row count.
    fn update(
        &self,
        table: &str,
        columns: &[String],
        values: &[Value],
        criteria: &Criteria,
    ) -> Result<usize>;

    /// Delete every row matching `criteria`. Returns the affected row count.
    fn delete(&self, table: &str, criteria: &Criteria) -> Result<usize>;

    /// Read rows. `columns` of `None` selects every column.
    fn select_rows(
        &self,
        table: &str,
        columns: Option<&[String]>,
        criteria: &Criteria,
        order: &[OrderBy],
    ) -> Result<Vec<Row>>;

    /// Read a single aggregate value.
    fn select_one_value(
        &self,
        table: &str,
        aggregate: &Aggregate,
        criteria: &Criteria,
    ) -> Result<Value>;

    /// Describe the physical columns of `table`.
    fn introspect_columns(&self, table: &str) -> Result<ColumnSet>;

    /// Create `table` with the given columns.
    fn create_table(&self, table: &str, columns: &ColumnSet) -> Result<()>;

    /// Drop `table`.
    fn drop_table(&self, table: &str) -> Result<()>;

    /// Check whether `table` exists.
    fn table_exists(&self, table: &str) -> Result<bool>;
}
