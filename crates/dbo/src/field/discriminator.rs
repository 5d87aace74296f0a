//! `subclass_name` discriminator fields.

use dbo_core::{ColumnType, Value};

use super::{FieldBehavior, FieldSpec};
use crate::config::DboConfig;
use crate::hooks::{Hook, HookEvent};
use crate::record::Record;

/// Stores which class a row belongs to.
///
/// By default the stored value is the class name itself; `map` lets a
/// table keep shorter or legacy values.
#[derive(Debug, Clone, Default)]
pub struct SubclassNameField {
    mapping: Vec<(String, String)>,
}

impl SubclassNameField {
    /// Store `value` for records of `class`.
    pub fn map(mut self, value: impl Into<String>, class: impl Into<String>) -> Self {
        self.mapping.push((value.into(), class.into()));
        self
    }

    /// Class a stored discriminator denotes.
    pub fn class_for_value<'a>(&'a self, value: &'a str) -> &'a str {
        self.mapping
            .iter()
            .find(|(v, _)| v == value)
            .map_or(value, |(_, class)| class.as_str())
    }

    /// Discriminator stored for records of `class`.
    pub fn value_for_class<'a>(&'a self, class: &'a str) -> &'a str {
        self.mapping
            .iter()
            .find(|(_, c)| c == class)
            .map_or(class, |(value, _)| value.as_str())
    }
}

impl FieldBehavior for SubclassNameField {
    fn type_name(&self) -> &'static str {
        "subclass_name"
    }

    fn column_type(&self) -> Option<ColumnType> {
        Some(ColumnType::Text)
    }

    fn implied_hooks(&self, spec: &FieldSpec, _config: &DboConfig) -> Vec<(HookEvent, Hook)> {
        let key = spec.storage_key();
        let field = self.clone();
        let hook = Hook::new(
            format!("init_{}", spec.name()),
            move |record: &mut Record| {
                if record.raw(&key).is_none_or(Value::is_empty) {
                    let value = field.value_for_class(record.class_name()).to_string();
                    record.set_raw(key.clone(), Value::Text(value));
                }
                Ok(true)
            },
        );
        vec![(HookEvent::PostNew, hook)]
    }
}
