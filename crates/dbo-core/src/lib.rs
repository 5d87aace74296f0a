//! Core types and the data-source contract for DBO.
//!
//! `dbo-core` is the **foundation layer** of the workspace. It defines the
//! values, column metadata, criteria and errors that the engine crate builds
//! on, plus the [`DataSource`] trait every storage backend implements.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: [`DataSource`] is the single boundary between the
//!   engine and storage. The engine never builds query text.
//! - **Data model**: [`Value`], [`Row`], [`Column`]/[`ColumnSet`] and
//!   [`Criteria`] describe what crosses that boundary.
//! - **Reference backend**: [`MemorySource`] implements the contract in memory.
//!
//! Most applications should use the `dbo` crate; reach for `dbo-core` directly
//! when writing a data source.

pub mod column;
pub mod criteria;
pub mod error;
pub mod memory;
pub mod source;
pub mod types;
pub mod validate;
pub mod value;

pub use column::{Column, ColumnSet};
pub use criteria::{Aggregate, Criteria, OrderBy};
pub use error::{Error, FieldValidationError, Result};
pub use memory::{MemorySource, MemoryStats};
pub use source::{DataSource, Row};
pub use types::ColumnType;
pub use value::Value;
