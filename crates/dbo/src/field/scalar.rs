//! `generic`, `string` and `number` fields.

use dbo_core::validate::{group_digits, parse_number};
use dbo_core::{ColumnType, FieldValidationError, Result, Value};

use super::{FieldBehavior, FieldSpec, required_diagnostic};
use crate::method::Operation;
use crate::record::Record;

/// Raw storage, no validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericField;

impl FieldBehavior for GenericField {
    fn type_name(&self) -> &'static str {
        "generic"
    }

    fn column_type(&self) -> Option<ColumnType> {
        Some(ColumnType::Text)
    }
}

/// Text with required and maximum-length checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringField;

impl FieldBehavior for StringField {
    fn type_name(&self) -> &'static str {
        "string"
    }

    fn column_type(&self) -> Option<ColumnType> {
        Some(ColumnType::Text)
    }

    fn operations(&self, name: &str) -> Vec<(String, Operation)> {
        vec![
            (name.to_string(), Operation::Get(name.to_string())),
            (format!("{name}_invalid"), Operation::Invalid(name.to_string())),
        ]
    }

    fn set(&self, spec: &FieldSpec, record: &mut Record, value: Value) -> Result<()> {
        let stored = match value {
            Value::Text(_) | Value::Null => value,
            other => {
                tracing::warn!(
                    class = record.class_name(),
                    field = spec.name(),
                    value = %other,
                    kind = other.type_name(),
                    "coercing non-text value to text"
                );
                Value::Text(other.to_text())
            }
        };
        record.set_raw(spec.storage_key(), stored);
        Ok(())
    }

    fn invalid(&self, spec: &FieldSpec, record: &Record) -> Result<Option<FieldValidationError>> {
        if let Some(diag) = required_diagnostic(spec, record) {
            return Ok(Some(diag));
        }
        let traits = spec.column_traits(record.class());
        let Some(limit) = traits.length else {
            return Ok(None);
        };
        let length = record
            .raw(&spec.storage_key())
            .map_or(0, |v| v.to_text().chars().count());
        if length > limit {
            return Ok(Some(FieldValidationError::new(
                spec.name(),
                format!(
                    "{} must be at most {limit} characters long (got {length})",
                    spec.name()
                ),
            )));
        }
        Ok(None)
    }
}

/// Numeric value; text input is parsed, anything unparseable is kept as-is
/// and reported by `invalid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberField;

impl NumberField {
    /// Grouped-digit display form.
    pub fn readable(&self, spec: &FieldSpec, record: &Record) -> String {
        match record.raw(&spec.storage_key()) {
            None | Some(Value::Null) => String::new(),
            Some(v @ (Value::Int(_) | Value::Float(_))) => group_digits(&v.to_text()),
            Some(other) => other.to_text(),
        }
    }
}

/// Shared numeric coercion for number-like kinds.
pub(crate) fn coerce_number(spec: &FieldSpec, record: &Record, value: Value) -> Value {
    match value {
        Value::Int(_) | Value::Float(_) | Value::Null => value,
        Value::Bool(b) => Value::Int(i64::from(b)),
        Value::Text(text) if text.trim().is_empty() => Value::Null,
        Value::Text(text) => parse_number(&text).unwrap_or_else(|| {
            tracing::warn!(
                class = record.class_name(),
                field = spec.name(),
                value = %text,
                "non-numeric input for numeric field"
            );
            Value::Text(text)
        }),
    }
}

/// Shared numeric diagnostic for number-like kinds.
pub(crate) fn numeric_diagnostic(
    spec: &FieldSpec,
    record: &Record,
) -> Option<FieldValidationError> {
    if let Some(diag) = required_diagnostic(spec, record) {
        return Some(diag);
    }
    match record.raw(&spec.storage_key()) {
        Some(Value::Text(text)) if !text.is_empty() && parse_number(text).is_none() => {
            Some(FieldValidationError::new(
                spec.name(),
                format!("{} must be a number (got '{text}')", spec.name()),
            ))
        }
        _ => None,
    }
}

impl FieldBehavior for NumberField {
    fn type_name(&self) -> &'static str {
        "number"
    }

    fn column_type(&self) -> Option<ColumnType> {
        Some(ColumnType::Numeric)
    }

    fn operations(&self, name: &str) -> Vec<(String, Operation)> {
        vec![
            (name.to_string(), Operation::Get(name.to_string())),
            (format!("{name}_invalid"), Operation::Invalid(name.to_string())),
            (format!("{name}_readable"), Operation::Readable(name.to_string())),
        ]
    }

    fn set(&self, spec: &FieldSpec, record: &mut Record, value: Value) -> Result<()> {
        let stored = coerce_number(spec, record, value);
        record.set_raw(spec.storage_key(), stored);
        Ok(())
    }

    fn invalid(&self, spec: &FieldSpec, record: &Record) -> Result<Option<FieldValidationError>> {
        Ok(numeric_diagnostic(spec, record))
    }
}
