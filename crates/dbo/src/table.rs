//! Physical tables.
//!
//! A [`Table`] binds a name to a shared [`DataSource`] and translates row
//! operations into data-source calls. Its [`ColumnSet`] is either declared
//! up front or introspected once on first use, then cached.

use std::sync::{Arc, PoisonError, RwLock};

use dbo_core::{Aggregate, ColumnSet, Criteria, DataSource, Error, OrderBy, Result, Row, Value};

use crate::config::DboConfig;

/// One physical table.
pub struct Table {
    name: String,
    source: Arc<dyn DataSource>,
    primary_key: String,
    new_key_sentinel: String,
    columns: RwLock<Option<Arc<ColumnSet>>>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .field("columns_cached", &self.cached_columns().is_some())
            .finish_non_exhaustive()
    }
}

impl Table {
    /// Table `name` on `source`, using the default key settings.
    pub fn new(name: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        Self::with_config(name, source, &DboConfig::default())
    }

    /// Table `name` on `source`, taking key settings from `config`.
    pub fn with_config(
        name: impl Into<String>,
        source: Arc<dyn DataSource>,
        config: &DboConfig,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            primary_key: config.primary_key.clone(),
            new_key_sentinel: config.new_key_sentinel.clone(),
            columns: RwLock::new(None),
        }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary key column.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// The shared data source.
    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    fn cached_columns(&self) -> Option<Arc<ColumnSet>> {
        self.columns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Use `columns` instead of introspecting.
    pub fn declare_columns(&self, columns: ColumnSet) {
        tracing::debug!(table = %self.name, columns = columns.len(), "declared columns");
        *self.columns.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(columns));
    }

    /// Column metadata, introspected on first access.
    ///
    /// Concurrent first accesses may each introspect; the first result stored
    /// wins and later ones are discarded.
    pub fn column_set(&self) -> Result<Arc<ColumnSet>> {
        if let Some(columns) = self.cached_columns() {
            return Ok(columns);
        }
        let introspected = Arc::new(self.source.introspect_columns(&self.name)?);
        tracing::debug!(
            table = %self.name,
            columns = introspected.len(),
            "introspected columns"
        );
        let mut slot = self.columns.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(slot.get_or_insert(introspected)))
    }

    fn is_assigned_key(&self, value: &Value) -> bool {
        !value.is_empty() && value.as_str() != Some(self.new_key_sentinel.as_str())
    }

    /// Insert `row`, writing the assigned primary key back into it.
    ///
    /// The primary key is always sent, as null when unassigned so the source
    /// fills it from its sequence. Other columns known to the table are sent
    /// when they hold a non-null value.
    #[tracing::instrument(level = "debug", skip(self, row), fields(table = %self.name))]
    pub fn insert_row(&self, row: &mut Row) -> Result<Value> {
        let columns = self.column_set()?;
        let mut names = Vec::new();
        let mut values = Vec::new();
        for column in &*columns {
            if column.name == self.primary_key {
                let key = row
                    .get(&column.name)
                    .filter(|v| self.is_assigned_key(v))
                    .cloned()
                    .unwrap_or_default();
                names.push(column.name.clone());
                values.push(key);
                continue;
            }
            match row.get(&column.name) {
                Some(value) if !value.is_null() => {
                    names.push(column.name.clone());
                    values.push(value.clone());
                }
                _ => {}
            }
        }

        let assigned = self
            .source
            .insert(&self.name, &names, &values, Some(&self.primary_key))?
            .filter(|id| !id.is_null())
            .ok_or_else(|| {
                Error::data_source(&self.name, "insert did not report a primary key")
            })?;
        row.insert(self.primary_key.clone(), assigned.clone());
        Ok(assigned)
    }

    fn key_of(&self, row: &Row) -> Result<Value> {
        row.get(&self.primary_key)
            .filter(|v| self.is_assigned_key(v))
            .cloned()
            .ok_or_else(|| Error::InvalidState {
                class: self.name.clone(),
                message: format!("row has no `{}` value", self.primary_key),
            })
    }

    /// Write every non-key column of `row` present in the table.
    #[tracing::instrument(level = "debug", skip(self, row), fields(table = %self.name))]
    pub fn update_row(&self, row: &Row) -> Result<usize> {
        let id = self.key_of(row)?;
        let columns = self.column_set()?;
        let (names, values): (Vec<String>, Vec<Value>) = columns
            .iter()
            .filter(|c| c.name != self.primary_key)
            .filter_map(|c| row.get(&c.name).map(|v| (c.name.clone(), v.clone())))
            .unzip();
        if names.is_empty() {
            return Ok(0);
        }
        self.source.update(
            &self.name,
            &names,
            &values,
            &Criteria::eq(self.primary_key.as_str(), id),
        )
    }

    /// Delete the row with `row`'s primary key.
    pub fn delete_row(&self, row: &Row) -> Result<usize> {
        let id = self.key_of(row)?;
        self.delete_id(&id)
    }

    /// Delete by primary key.
    pub fn delete_id(&self, id: &Value) -> Result<usize> {
        self.delete_where(&Criteria::eq(self.primary_key.as_str(), id.clone()))
    }

    /// Delete every matching row.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.name))]
    pub fn delete_where(&self, criteria: &Criteria) -> Result<usize> {
        self.source.delete(&self.name, criteria)
    }

    /// Delete every row.
    pub fn delete_all(&self) -> Result<usize> {
        self.delete_where(&Criteria::All)
    }

    /// Matching rows in `order`.
    #[tracing::instrument(level = "debug", skip(self, order), fields(table = %self.name))]
    pub fn fetch_select(&self, criteria: &Criteria, order: &[OrderBy]) -> Result<Vec<Row>> {
        self.source.select_rows(&self.name, None, criteria, order)
    }

    /// Every row, by primary key.
    pub fn fetch_all(&self) -> Result<Vec<Row>> {
        self.fetch_select(&Criteria::All, &[OrderBy::asc(self.primary_key.as_str())])
    }

    /// The row with primary key `id`.
    pub fn fetch_id(&self, id: &Value) -> Result<Option<Row>> {
        Ok(self
            .fetch_select(&Criteria::eq(self.primary_key.as_str(), id.clone()), &[])?
            .into_iter()
            .next())
    }

    /// Number of matching rows.
    pub fn count_rows(&self, criteria: &Criteria) -> Result<usize> {
        let count = self
            .source
            .select_one_value(&self.name, &Aggregate::Count, criteria)?;
        count
            .as_i64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| Error::data_source(&self.name, format!("bad row count {count}")))
    }

    /// Largest non-null value of `column` among matching rows.
    pub fn fetch_max(&self, column: &str, criteria: &Criteria) -> Result<Value> {
        self.source.select_one_value(
            &self.name,
            &Aggregate::Max(column.to_string()),
            criteria,
        )
    }

    /// Create the table from the declared columns.
    pub fn table_create(&self) -> Result<()> {
        let columns = self.cached_columns().ok_or_else(|| {
            Error::config(format!("no columns declared for table `{}`", self.name))
        })?;
        tracing::info!(table = %self.name, columns = columns.len(), "creating table");
        self.source.create_table(&self.name, &columns)
    }

    /// Drop the table.
    pub fn table_drop(&self) -> Result<()> {
        tracing::info!(table = %self.name, "dropping table");
        self.source.drop_table(&self.name)
    }

    /// True if the table exists in the data source.
    pub fn table_exists(&self) -> Result<bool> {
        self.source.table_exists(&self.name)
    }

    /// Create the table unless it exists. Returns true when it was created.
    pub fn table_ensure_exists(&self) -> Result<bool> {
        if self.table_exists()? {
            return Ok(false);
        }
        self.table_create()?;
        Ok(true)
    }

    /// Drop (if present) and create again. Rows are lost.
    pub fn table_recreate(&self) -> Result<()> {
        if self.table_exists()? {
            self.table_drop()?;
        }
        self.table_create()
    }

    /// Recreate the table with the declared columns, keeping its rows.
    ///
    /// Rows are read before the drop and reinserted with their primary keys;
    /// values for columns no longer declared are discarded. Returns the
    /// number of rows carried over.
    pub fn table_recreate_with_rows(&self) -> Result<usize> {
        let rows = if self.table_exists()? {
            self.source
                .select_rows(&self.name, None, &Criteria::All, &[])?
        } else {
            Vec::new()
        };
        self.table_recreate()?;
        for mut row in rows.iter().cloned() {
            self.insert_row(&mut row)?;
        }
        tracing::info!(table = %self.name, rows = rows.len(), "recreated table with rows");
        Ok(rows.len())
    }
}
