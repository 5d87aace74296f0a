//! Schema-driven records: declarative fields, generated methods, hook-driven
//! persistence.
//!
//! `dbo` is the **engine layer** of the workspace. A record class is declared
//! as a list of [`FieldSpec`]s; building the class generates its operation
//! table (accessors, validators, relationship traversal) and its lifecycle
//! hook chains. [`Record`]s then move through construct, fetch, insert,
//! update and delete, delegating storage to a [`Table`] on a shared
//! [`DataSource`].
//!
//! # Role In The Architecture
//!
//! - **Field kinds**: [`field`] holds the closed set of kinds and the
//!   [`FieldBehavior`](field::FieldBehavior) interface they implement.
//! - **Classes**: [`Catalog`] registers [`RecordClass`]es by name, resolving
//!   inheritance, relations and discriminators.
//! - **Records**: [`Record`] and [`RecordSet`] carry values and run hooks.
//! - **Storage**: [`Table`] and [`TableSet`] talk to the data source.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use dbo::prelude::*;
//!
//! let catalog = Catalog::new();
//! catalog
//!     .define("Artist")
//!     .field(FieldSpec::string("name").length(64).required(true))
//!     .field(FieldSpec::timestamp("created").created())
//!     .build(&catalog)?;
//!
//! let mut tables = TableSet::new(&catalog, Arc::new(MemorySource::new()));
//! tables.bind("Artist", "artist")?;
//! tables.declare_tables();
//! tables.create_tables()?;
//!
//! let artist_class = catalog.class("Artist")?;
//! let mut artist = artist_class.new_record(Row::new())?;
//! artist.set("name", "Nina Simone")?;
//! artist.save_record()?;
//!
//! let fetched = artist_class.fetch_id(artist.id().unwrap())?.unwrap();
//! assert_eq!(fetched.raw_value("name"), Value::from("Nina Simone"));
//! # Ok::<(), dbo::Error>(())
//! ```

pub mod class;
pub mod config;
pub mod field;
pub mod hooks;
pub mod method;
pub mod record;
pub mod record_set;
pub mod table;
pub mod table_set;

pub use class::{Catalog, RecordClass, RecordClassBuilder};
pub use config::DboConfig;
pub use field::{DeletePolicy, FieldKind, FieldSpec};
pub use hooks::{Hook, HookEvent};
pub use method::{MethodFn, MethodResult, Operation};
pub use record::{Record, RecordState};
pub use record_set::RecordSet;
pub use table::Table;
pub use table_set::TableSet;

pub use dbo_core::{
    Column, ColumnSet, ColumnType, Criteria, DataSource, Error, FieldValidationError,
    MemorySource, OrderBy, Result, Row, Value,
};

/// Everything needed to declare classes and work with records.
pub mod prelude {
    pub use crate::{
        Catalog, Criteria, DboConfig, DeletePolicy, Error, FieldSpec, HookEvent, MemorySource,
        OrderBy, Record, RecordClass, RecordSet, Result, Row, Table, TableSet, Value,
    };
}
