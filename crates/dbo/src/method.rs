//! Per-class operation tables.
//!
//! Field declarations are turned into named [`Operation`]s when a class is
//! built; [`Record::invoke`](crate::Record::invoke) looks the name up and
//! dispatches. Class authors add their own methods (`init_total`,
//! `status_is_cart`, ...) as [`MethodFn`] closures.

use std::sync::Arc;

use chrono::NaiveDateTime;
use dbo_core::{FieldValidationError, Result, Value};

use crate::record::Record;
use crate::record_set::RecordSet;

/// Class-defined method: receives the record and positional arguments.
pub type MethodFn = Arc<dyn Fn(&mut Record, &[Value]) -> Result<Value> + Send + Sync>;

/// A generated or declared method in a class's operation table.
///
/// Field-bound variants carry the field name they were generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `f`: read the field, or set it when called with one argument.
    Get(String),
    /// `f_invalid`: validation diagnostic.
    Invalid(String),
    /// `f_readable`: display form; currency fields parse one argument.
    Readable(String),
    /// `touch_f`: set a temporal field to now.
    Touch(String),
    /// `f_obj`: parsed temporal value.
    Object(String),
    /// `reset_f`: recompute and store a saved total.
    Reset(String),
    /// `f_difference`: recomputed total minus stored total.
    Difference(String),
    /// `assign_f`: generate a unique code.
    AssignCode(String),
    /// `x_id`: raw foreign key.
    RelatedId(String),
    /// `x`: resolve a foreign key.
    Related(String),
    /// `required_x`: resolve a foreign key or fail.
    RequiredRelated(String),
    /// `x`: fetch line items.
    Items(String),
    /// `count_x`: count line items.
    CountItems(String),
    /// `new_x`: construct a pre-linked line item.
    NewItem(String),
    /// `delete_x`: delete every line item.
    DeleteItems(String),
    /// Call another method with the same arguments.
    Alias(String),
    /// Call `method` on the record behind foreign key `relation`.
    Forward {
        /// Foreign key field name.
        relation: String,
        /// Method invoked on the related record.
        method: String,
    },
    /// A class-defined [`MethodFn`].
    Custom(String),
}

/// What a method call produced.
#[derive(Debug, Clone)]
pub enum MethodResult {
    /// Nothing (setters, touch).
    Unit,
    /// A scalar.
    Value(Value),
    /// Display text.
    Text(String),
    /// Validation outcome.
    Invalid(Option<FieldValidationError>),
    /// Parsed temporal value.
    Time(Option<NaiveDateTime>),
    /// A related record.
    Record(Option<Box<Record>>),
    /// Related records.
    Records(RecordSet),
}

impl MethodResult {
    /// Collapse into a scalar.
    ///
    /// Records become their id, record sets their count, diagnostics their
    /// message, times their Unix timestamp.
    pub fn into_value(self) -> Value {
        match self {
            MethodResult::Unit => Value::Null,
            MethodResult::Value(v) => v,
            MethodResult::Text(s) => Value::Text(s),
            MethodResult::Invalid(diag) => diag.map_or(Value::Null, |d| Value::Text(d.message)),
            MethodResult::Time(t) => t.map_or(Value::Null, |t| Value::Int(t.and_utc().timestamp())),
            MethodResult::Record(r) => r.and_then(|r| r.id().cloned()).unwrap_or_default(),
            MethodResult::Records(set) => Value::from(set.len()),
        }
    }

    /// True for an explicit `false` scalar, the only result that vetoes a
    /// `pre_delete` binding.
    pub fn is_veto(&self) -> bool {
        matches!(self, MethodResult::Value(Value::Bool(false)))
    }

    /// Take the record set out of a `Records` result.
    pub fn into_records(self) -> Option<RecordSet> {
        match self {
            MethodResult::Records(set) => Some(set),
            _ => None,
        }
    }

    /// Take the record out of a `Record` result.
    pub fn into_record(self) -> Option<Record> {
        match self {
            MethodResult::Record(r) => r.map(|b| *b),
            _ => None,
        }
    }
}
