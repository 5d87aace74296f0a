//! Field kinds and the capability interface they implement.
//!
//! A class author declares [`FieldSpec`]s; each spec carries one [`FieldKind`]
//! variant. At class build time every kind contributes
//!
//! - the named operations it generates (`touch_created`, `count_discs`, ...),
//! - an optional physical column,
//! - hooks it needs on the declaring class (pre-insert code assignment,
//!   restrict/cascade delete policy, discriminator initialization).
//!
//! At run time the record dispatches get/set/invalid through
//! [`FieldBehavior`].

mod code;
mod currency;
mod discriminator;
mod registry;
mod relation;
mod scalar;
mod spec;
mod temporal;
mod total;

use std::fmt;

use dbo_core::{ColumnType, FieldValidationError, Result, Value};

use crate::config::DboConfig;
use crate::hooks::{Hook, HookEvent};
use crate::method::Operation;
use crate::record::Record;

pub use code::{DEFAULT_CODE_CHARS, UniqueCodeField};
pub use currency::CurrencyField;
pub use discriminator::SubclassNameField;
pub use registry::FieldRegistry;
pub use relation::{AliasField, DeletePolicy, ForeignKeyField, LineItemsField};
pub use scalar::{GenericField, NumberField, StringField};
pub use spec::{ColumnTraits, FieldSpec, HookBinding};
pub use temporal::{TemporalField, TemporalUnit, parse_datetime};
pub use total::SavedTotalField;

/// Behavior shared by every field kind.
///
/// Defaults implement the `generic` contract: raw get/set against the storage
/// key, no validation, no extra operations.
pub trait FieldBehavior: fmt::Debug + Send + Sync {
    /// Declarative type name (`string`, `foreign_key`, ...).
    fn type_name(&self) -> &'static str;

    /// Physical column type, or `None` for kinds that store nothing.
    fn column_type(&self) -> Option<ColumnType>;

    /// Storage key derived from the field name.
    fn storage_key(&self, name: &str) -> String {
        name.to_string()
    }

    /// Operations generated for a field called `name`.
    fn operations(&self, name: &str) -> Vec<(String, Operation)> {
        vec![(name.to_string(), Operation::Get(name.to_string()))]
    }

    /// Hooks this kind installs on the declaring class.
    fn implied_hooks(&self, _spec: &FieldSpec, _config: &DboConfig) -> Vec<(HookEvent, Hook)> {
        Vec::new()
    }

    /// Build-time check that every method this kind depends on exists.
    fn check(&self, _spec: &FieldSpec, _has_method: &dyn Fn(&str) -> bool) -> Result<()> {
        Ok(())
    }

    /// Read the value.
    fn get(&self, spec: &FieldSpec, record: &mut Record) -> Result<Value> {
        Ok(record.raw_value(&spec.storage_key()))
    }

    /// Write the value.
    fn set(&self, spec: &FieldSpec, record: &mut Record, value: Value) -> Result<()> {
        record.set_raw(spec.storage_key(), value);
        Ok(())
    }

    /// Validation diagnostic, if the current value is unacceptable.
    fn invalid(&self, _spec: &FieldSpec, _record: &Record) -> Result<Option<FieldValidationError>> {
        Ok(None)
    }
}

/// The closed set of field kinds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Raw get/set.
    Generic(GenericField),
    /// Text with required/length validation.
    String(StringField),
    /// Numeric with coercion.
    Number(NumberField),
    /// `timestamp` or `julian_day`.
    Temporal(TemporalField),
    /// Integer US pennies.
    Currency(CurrencyField),
    /// Cached computed total.
    SavedTotal(SavedTotalField),
    /// Engine-assigned unique code.
    UniqueCode(UniqueCodeField),
    /// Reference to a record of another class.
    ForeignKey(ForeignKeyField),
    /// One-to-many relation; stores nothing.
    LineItems(LineItemsField),
    /// Method delegation; stores nothing.
    Alias(AliasField),
    /// Stored subclass discriminator.
    SubclassName(SubclassNameField),
}

impl FieldKind {
    /// The behavior implementing this kind.
    pub fn behavior(&self) -> &dyn FieldBehavior {
        match self {
            FieldKind::Generic(b) => b,
            FieldKind::String(b) => b,
            FieldKind::Number(b) => b,
            FieldKind::Temporal(b) => b,
            FieldKind::Currency(b) => b,
            FieldKind::SavedTotal(b) => b,
            FieldKind::UniqueCode(b) => b,
            FieldKind::ForeignKey(b) => b,
            FieldKind::LineItems(b) => b,
            FieldKind::Alias(b) => b,
            FieldKind::SubclassName(b) => b,
        }
    }

    /// Declarative type name.
    pub fn type_name(&self) -> &'static str {
        self.behavior().type_name()
    }

    /// True if the kind synthesizes a physical column.
    pub fn has_column(&self) -> bool {
        self.behavior().column_type().is_some()
    }
}

/// Diagnostic for a required field holding no value.
pub(crate) fn required_diagnostic(
    spec: &FieldSpec,
    record: &Record,
) -> Option<FieldValidationError> {
    let traits = spec.column_traits(record.class());
    let empty = record
        .raw(&spec.storage_key())
        .is_none_or(Value::is_empty);
    (traits.required && empty)
        .then(|| FieldValidationError::new(spec.name(), format!("{} is required", spec.name())))
}
