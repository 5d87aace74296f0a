//! `currency_uspennies` fields.

use dbo_core::validate::{format_currency, has_currency_symbol, parse_currency, parse_number};
use dbo_core::{ColumnType, FieldValidationError, Result, Value};

use super::scalar::numeric_diagnostic;
use super::{FieldBehavior, FieldSpec};
use crate::method::Operation;
use crate::record::Record;

/// Integer US pennies with `$1,234.56` display.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyField;

impl CurrencyField {
    /// Convert input to pennies.
    ///
    /// Text with a leading `$` is dollars; any other number is already in
    /// pennies. Unparseable text is kept for `invalid` to report.
    pub fn normalize(&self, value: Value) -> Value {
        match value {
            Value::Null | Value::Int(_) => value,
            Value::Float(f) => Value::Int(f.round() as i64),
            Value::Bool(b) => Value::Int(i64::from(b)),
            Value::Text(text) if text.trim().is_empty() => Value::Null,
            Value::Text(text) if has_currency_symbol(&text) => {
                parse_currency(&text).map_or(Value::Text(text), Value::Int)
            }
            Value::Text(text) => match parse_number(&text) {
                Some(Value::Float(f)) => Value::Int(f.round() as i64),
                Some(n) => n,
                None => Value::Text(text),
            },
        }
    }

    /// Display form, e.g. `$12.50`. Empty when unset or not numeric.
    pub fn readable(&self, spec: &FieldSpec, record: &Record) -> String {
        record
            .raw(&spec.storage_key())
            .and_then(|v| match v {
                Value::Int(n) => Some(*n),
                _ => None,
            })
            .map(format_currency)
            .unwrap_or_default()
    }

    /// Parse a display-form amount and store it. A missing `$` is implied,
    /// so `"12.50"` stores 1250.
    pub fn set_readable(&self, spec: &FieldSpec, record: &mut Record, text: &str) {
        let parsed = if has_currency_symbol(text) {
            parse_currency(text)
        } else {
            parse_currency(&format!("${}", text.trim()))
        };
        let stored = parsed.map_or_else(|| Value::Text(text.to_string()), Value::Int);
        record.set_raw(spec.storage_key(), stored);
    }
}

impl FieldBehavior for CurrencyField {
    fn type_name(&self) -> &'static str {
        "currency_uspennies"
    }

    fn column_type(&self) -> Option<ColumnType> {
        Some(ColumnType::Int)
    }

    fn operations(&self, name: &str) -> Vec<(String, Operation)> {
        vec![
            (name.to_string(), Operation::Get(name.to_string())),
            (format!("{name}_invalid"), Operation::Invalid(name.to_string())),
            (format!("{name}_readable"), Operation::Readable(name.to_string())),
        ]
    }

    fn set(&self, spec: &FieldSpec, record: &mut Record, value: Value) -> Result<()> {
        let stored = self.normalize(value);
        record.set_raw(spec.storage_key(), stored);
        Ok(())
    }

    fn invalid(&self, spec: &FieldSpec, record: &Record) -> Result<Option<FieldValidationError>> {
        Ok(numeric_diagnostic(spec, record))
    }
}
