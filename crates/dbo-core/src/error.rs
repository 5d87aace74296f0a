//! Error types shared by every DBO crate.
//!
//! Two families are kept apart on purpose:
//!
//! - [`Error`] is returned through `Result` and aborts the current operation:
//!   configuration mistakes, rows that were required but missing, data-source
//!   failures.
//! - [`FieldValidationError`] is an ordinary value produced by a field's
//!   `invalid` check. Bad input data never surfaces as an `Err`.

use std::fmt;

use thiserror::Error as ThisError;

/// Result alias used across DBO.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors raised by the engine and its collaborators.
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum Error {
    /// Setup mistake: no table bound, unknown class, unknown method, missing
    /// related class, and so on.
    #[error("configuration error: {0}")]
    Config(String),

    /// A row the caller explicitly expected does not exist.
    #[error("{class}: no row found for {context}")]
    NotFound {
        /// Record class (or table) that was queried.
        class: String,
        /// What was being looked up, including the key values.
        context: String,
    },

    /// Column lookup by name failed.
    #[error("no column named `{name}` in table `{table}`; available columns: {}", available.join(", "))]
    UnknownColumn {
        /// Table whose column set was searched.
        table: String,
        /// The missing column.
        name: String,
        /// Every column the set does contain.
        available: Vec<String>,
    },

    /// Attempt to write a field that only the engine may assign.
    #[error("field `{field}` of {class} is read-only")]
    ReadOnly {
        /// Record class declaring the field.
        class: String,
        /// The field name.
        field: String,
    },

    /// Operation not valid in the record's current lifecycle state.
    #[error("{class}: {message}")]
    InvalidState {
        /// Record class.
        class: String,
        /// What was attempted.
        message: String,
    },

    /// Unique code generation ran out of attempts without finding a free code.
    #[error("no unused code for {class}.{field} after {attempts} attempts")]
    CodeSpaceExhausted {
        /// Record class declaring the code field.
        class: String,
        /// The code field.
        field: String,
        /// Number of candidates drawn.
        attempts: usize,
    },

    /// Failure reported by the data-source collaborator.
    #[error("data source error on `{table}`: {message}")]
    DataSource {
        /// Table the request targeted.
        table: String,
        /// Collaborator-supplied detail.
        message: String,
    },

    /// Anything else.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Build a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Build a not-found error.
    pub fn not_found(class: impl Into<String>, context: impl Into<String>) -> Self {
        Error::NotFound {
            class: class.into(),
            context: context.into(),
        }
    }

    /// Build a data-source error.
    pub fn data_source(table: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DataSource {
            table: table.into(),
            message: message.into(),
        }
    }

    /// True for [`Error::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True for [`Error::Config`].
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Diagnostic returned by a field's `invalid` check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValidationError {
    /// The field that failed.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl FieldValidationError {
    /// Create a diagnostic for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
