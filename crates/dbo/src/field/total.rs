//! `saved_total` and `saved_total_uspennies` fields.
//!
//! A saved total caches the result of the class method `init_{name}` in its
//! own column. While the record is still being edited (the reset predicate
//! holds) every read recomputes; afterwards the stored value is frozen.

use dbo_core::{ColumnType, Error, Result, Value};

use super::{FieldBehavior, FieldSpec};
use crate::method::Operation;
use crate::record::Record;

const DEFAULT_RESET_PREDICATE: &str = "status_is_cart";

/// Cached computed total.
#[derive(Debug, Clone, Default)]
pub struct SavedTotalField {
    pennies: bool,
    reset_if: Option<String>,
}

impl SavedTotalField {
    /// Plain numeric total.
    pub fn new() -> Self {
        Self::default()
    }

    /// Integer-pennies total. Also recomputes when nothing is stored yet.
    pub fn pennies() -> Self {
        Self {
            pennies: true,
            reset_if: None,
        }
    }

    /// Recompute on read while `method` returns a truthy value.
    pub fn reset_if(mut self, method: impl Into<String>) -> Self {
        self.reset_if = Some(method.into());
        self
    }

    /// True for the pennies variant.
    pub fn is_pennies(&self) -> bool {
        self.pennies
    }

    fn predicate(&self) -> &str {
        self.reset_if.as_deref().unwrap_or(DEFAULT_RESET_PREDICATE)
    }

    fn init_method(spec: &FieldSpec) -> String {
        format!("init_{}", spec.name())
    }

    /// Run `init_{name}` without storing the result.
    pub fn compute(&self, spec: &FieldSpec, record: &mut Record) -> Result<Value> {
        let value = record.invoke(&Self::init_method(spec), &[])?.into_value();
        Ok(match value {
            Value::Float(f) if self.pennies => Value::Int(f.round() as i64),
            other => other,
        })
    }

    fn should_recompute(&self, spec: &FieldSpec, record: &mut Record) -> Result<bool> {
        if self.pennies && record.raw(&spec.storage_key()).is_none_or(Value::is_empty) {
            return Ok(true);
        }
        let predicate = self.predicate();
        // The default predicate is optional; an explicit one is checked at build.
        if self.reset_if.is_none() && !record.class().has_method(predicate) {
            return Ok(false);
        }
        Ok(record.invoke(predicate, &[])?.into_value().is_truthy())
    }

    /// Recompute and store.
    pub fn reset(&self, spec: &FieldSpec, record: &mut Record) -> Result<Value> {
        let value = self.compute(spec, record)?;
        tracing::debug!(
            class = record.class_name(),
            field = spec.name(),
            value = %value,
            "saved total reset"
        );
        record.set_raw(spec.storage_key(), value.clone());
        Ok(value)
    }

    /// Freshly computed total minus the stored one. The record is not changed.
    pub fn difference(&self, spec: &FieldSpec, record: &mut Record) -> Result<Value> {
        let fresh = self.compute(spec, record)?;
        let stored = record.raw_value(&spec.storage_key());
        Ok(subtract(&fresh, &stored))
    }
}

fn subtract(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a - b),
        (a, Value::Null) => a.as_f64().map_or(Value::Null, |_| a.clone()),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => Value::Float(a - b),
            _ => Value::Null,
        },
    }
}

impl FieldBehavior for SavedTotalField {
    fn type_name(&self) -> &'static str {
        if self.pennies {
            "saved_total_uspennies"
        } else {
            "saved_total"
        }
    }

    fn column_type(&self) -> Option<ColumnType> {
        Some(if self.pennies {
            ColumnType::Int
        } else {
            ColumnType::Numeric
        })
    }

    fn operations(&self, name: &str) -> Vec<(String, Operation)> {
        vec![
            (name.to_string(), Operation::Get(name.to_string())),
            (format!("reset_{name}"), Operation::Reset(name.to_string())),
            (
                format!("{name}_difference"),
                Operation::Difference(name.to_string()),
            ),
        ]
    }

    fn check(&self, spec: &FieldSpec, has_method: &dyn Fn(&str) -> bool) -> Result<()> {
        let init = Self::init_method(spec);
        if !has_method(&init) {
            return Err(Error::config(format!(
                "{} field `{}` needs a class method `{init}`",
                self.type_name(),
                spec.name()
            )));
        }
        if let Some(predicate) = &self.reset_if {
            if !has_method(predicate) {
                return Err(Error::config(format!(
                    "{} field `{}` resets on unknown method `{predicate}`",
                    self.type_name(),
                    spec.name()
                )));
            }
        }
        Ok(())
    }

    fn get(&self, spec: &FieldSpec, record: &mut Record) -> Result<Value> {
        if self.should_recompute(spec, record)? {
            return self.reset(spec, record);
        }
        Ok(record.raw_value(&spec.storage_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtract() {
        assert_eq!(subtract(&Value::Int(500), &Value::Int(200)), Value::Int(300));
        assert_eq!(subtract(&Value::Int(500), &Value::Null), Value::Int(500));
        assert_eq!(
            subtract(&Value::Float(2.5), &Value::Int(1)),
            Value::Float(1.5)
        );
        assert_eq!(subtract(&Value::from("x"), &Value::Int(1)), Value::Null);
    }

    #[test]
    fn test_check_requires_init_method() {
        let spec = FieldSpec::saved_total("total");
        let field = SavedTotalField::new();
        assert!(field.check(&spec, &|_| false).unwrap_err().is_config());
        assert!(field.check(&spec, &|m| m == "init_total").is_ok());

        let strict = SavedTotalField::new().reset_if("is_open");
        assert!(strict.check(&spec, &|m| m == "init_total").is_err());
    }
}
