//! Schema management across a group of record classes.

use std::sync::Arc;

use dbo_core::{DataSource, Result};

use crate::class::{Catalog, RecordClass};
use crate::table::Table;

/// Record classes bound to tables on one shared data source.
///
/// ```
/// use std::sync::Arc;
/// use dbo::{Catalog, FieldSpec, MemorySource, TableSet};
///
/// let catalog = Catalog::new();
/// catalog.define("Artist").field(FieldSpec::string("name")).build(&catalog).unwrap();
///
/// let mut tables = TableSet::new(&catalog, Arc::new(MemorySource::new()));
/// tables.bind("Artist", "artist").unwrap();
/// tables.declare_tables();
/// tables.create_tables().unwrap();
/// assert!(tables.table("Artist").unwrap().table_exists().unwrap());
/// ```
pub struct TableSet {
    catalog: Arc<Catalog>,
    source: Arc<dyn DataSource>,
    bindings: Vec<(Arc<RecordClass>, Arc<Table>)>,
}

impl std::fmt::Debug for TableSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSet")
            .field(
                "bindings",
                &self
                    .bindings
                    .iter()
                    .map(|(c, t)| (c.name(), t.name()))
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl TableSet {
    /// Empty set over `source`.
    pub fn new(catalog: &Arc<Catalog>, source: Arc<dyn DataSource>) -> Self {
        Self {
            catalog: Arc::clone(catalog),
            source,
            bindings: Vec::new(),
        }
    }

    /// The shared data source.
    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    /// Bind `class` to a table called `table` and return the table.
    pub fn bind(&mut self, class: &str, table: &str) -> Result<Arc<Table>> {
        let class = self.catalog.class(class)?;
        let table = Arc::new(Table::with_config(
            table,
            Arc::clone(&self.source),
            self.catalog.config(),
        ));
        class.bind_table(Arc::clone(&table));
        self.bindings.push((class, Arc::clone(&table)));
        Ok(table)
    }

    /// The table bound to `class`.
    pub fn table(&self, class: &str) -> Option<Arc<Table>> {
        self.bindings
            .iter()
            .find(|(c, _)| c.name() == class)
            .map(|(_, t)| Arc::clone(t))
    }

    /// Bound classes, in binding order.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<RecordClass>> {
        self.bindings.iter().map(|(c, _)| c)
    }

    /// Declare every table's columns from its class's fields.
    pub fn declare_tables(&self) {
        for (class, table) in &self.bindings {
            table.declare_columns(class.field_columns(table.name()));
        }
    }

    /// Create every table. Fails if one already exists.
    pub fn create_tables(&self) -> Result<()> {
        for (_, table) in &self.bindings {
            table.table_create()?;
        }
        Ok(())
    }

    /// Create the tables that do not exist yet; returns how many were created.
    pub fn ensure_tables_exist(&self) -> Result<usize> {
        let mut created = 0;
        for (_, table) in &self.bindings {
            if table.table_ensure_exists()? {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Redeclare every table from its class and recreate it, keeping rows.
    pub fn refresh_tables_schema(&self) -> Result<usize> {
        self.declare_tables();
        let mut rows = 0;
        for (_, table) in &self.bindings {
            rows += table.table_recreate_with_rows()?;
        }
        Ok(rows)
    }

    /// Drop every existing table, in reverse binding order.
    pub fn drop_tables(&self) -> Result<()> {
        for (_, table) in self.bindings.iter().rev() {
            if table.table_exists()? {
                table.table_drop()?;
            }
        }
        Ok(())
    }
}
