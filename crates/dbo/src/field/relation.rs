//! Relationship fields: `foreign_key`, `line_items` and `alias`.

use dbo_core::{ColumnType, Criteria, Error, FieldValidationError, Result, Row, Value};
use serde::{Deserialize, Serialize};

use super::{FieldBehavior, FieldSpec, required_diagnostic};
use crate::class::RecordClass;
use crate::config::DboConfig;
use crate::hooks::{Hook, HookEvent};
use crate::method::Operation;
use crate::record::Record;
use crate::record_set::RecordSet;

/// What deleting an owner does to its line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Nothing; the application deletes children itself.
    #[default]
    Manual,
    /// Veto the delete while line items exist.
    Restrict,
    /// Delete every line item first.
    Cascade,
}

/// Reference to one record of another class, stored as `{name}_id`.
#[derive(Debug, Clone)]
pub struct ForeignKeyField {
    related_class: String,
    forward: Vec<String>,
}

impl ForeignKeyField {
    /// Reference to `related_class`.
    pub fn new(related_class: impl Into<String>) -> Self {
        Self {
            related_class: related_class.into(),
            forward: Vec::new(),
        }
    }

    /// Expose `method` of the related record on the owning class.
    pub fn forward(mut self, method: impl Into<String>) -> Self {
        self.forward.push(method.into());
        self
    }

    /// Name of the referenced class.
    pub fn related_class(&self) -> &str {
        &self.related_class
    }

    /// Methods forwarded to the related record.
    pub fn forwarded(&self) -> &[String] {
        &self.forward
    }

    /// Fetch the referenced record. `None` when unset or dangling.
    pub fn related(&self, spec: &FieldSpec, record: &Record) -> Result<Option<Record>> {
        let id = record.raw_value(&spec.storage_key());
        if id.is_empty() {
            return Ok(None);
        }
        let class = record.class().resolve_class(&self.related_class)?;
        class.fetch_id(&id)
    }

    /// Fetch the referenced record or fail naming both ends of the link.
    pub fn required_related(&self, spec: &FieldSpec, record: &Record) -> Result<Record> {
        self.related(spec, record)?.ok_or_else(|| {
            let id = record.id().map_or_else(|| "unsaved".to_string(), Value::to_text);
            let related_id = record.raw_value(&spec.storage_key());
            Error::not_found(
                self.related_class.clone(),
                format!(
                    "{}.{} of record {id} (related id '{related_id}')",
                    record.class_name(),
                    spec.name()
                ),
            )
        })
    }

    /// Point the field at `related`, or clear it.
    pub fn set_related(&self, spec: &FieldSpec, record: &mut Record, related: Option<&Record>) {
        let id = related.and_then(Record::id).cloned().unwrap_or_default();
        record.set_raw(spec.storage_key(), id);
    }
}

impl FieldBehavior for ForeignKeyField {
    fn type_name(&self) -> &'static str {
        "foreign_key"
    }

    fn column_type(&self) -> Option<ColumnType> {
        Some(ColumnType::Int)
    }

    fn storage_key(&self, name: &str) -> String {
        format!("{name}_id")
    }

    fn operations(&self, name: &str) -> Vec<(String, Operation)> {
        let mut ops = vec![
            (format!("{name}_id"), Operation::RelatedId(name.to_string())),
            (name.to_string(), Operation::Related(name.to_string())),
            (
                format!("required_{name}"),
                Operation::RequiredRelated(name.to_string()),
            ),
        ];
        ops.extend(self.forward.iter().map(|method| {
            (
                method.clone(),
                Operation::Forward {
                    relation: name.to_string(),
                    method: method.clone(),
                },
            )
        }));
        ops
    }

    fn invalid(&self, spec: &FieldSpec, record: &Record) -> Result<Option<FieldValidationError>> {
        if let Some(diag) = required_diagnostic(spec, record) {
            return Ok(Some(diag));
        }
        let id = record.raw_value(&spec.storage_key());
        if id.is_empty() || self.related(spec, record)?.is_some() {
            return Ok(None);
        }
        Ok(Some(FieldValidationError::new(
            spec.name(),
            format!(
                "{} refers to a missing {} (id '{id}')",
                spec.name(),
                self.related_class
            ),
        )))
    }
}

/// Records of another class whose foreign key points at this record.
#[derive(Debug, Clone)]
pub struct LineItemsField {
    related_class: String,
    related_field: String,
    on_delete: Option<DeletePolicy>,
}

impl LineItemsField {
    /// Items of `related_class` linked through its `related_field` foreign key.
    pub fn new(related_class: impl Into<String>, related_field: impl Into<String>) -> Self {
        Self {
            related_class: related_class.into(),
            related_field: related_field.into(),
            on_delete: None,
        }
    }

    /// Override the configured default delete policy.
    pub fn on_delete(mut self, policy: DeletePolicy) -> Self {
        self.on_delete = Some(policy);
        self
    }

    /// Name of the item class.
    pub fn related_class(&self) -> &str {
        &self.related_class
    }

    /// Effective delete policy.
    pub fn policy(&self, config: &DboConfig) -> DeletePolicy {
        self.on_delete.unwrap_or(config.default_delete_policy)
    }

    fn item_class(&self, record: &Record) -> Result<std::sync::Arc<RecordClass>> {
        record.class().resolve_class(&self.related_class)
    }

    fn link_column(&self, class: &RecordClass) -> String {
        class
            .field(&self.related_field)
            .map_or_else(|| format!("{}_id", self.related_field), |s| s.storage_key())
    }

    /// Criteria selecting this record's items, or `None` for an unsaved owner.
    fn criteria(
        &self,
        class: &RecordClass,
        record: &Record,
        extra: Option<&Criteria>,
    ) -> Option<Criteria> {
        let id = record.id()?.clone();
        let link = Criteria::eq(self.link_column(class), id);
        Some(match extra {
            Some(extra) => link.and(extra.clone()),
            None => link,
        })
    }

    /// Fetch the items.
    pub fn items(&self, record: &Record, extra: Option<&Criteria>) -> Result<RecordSet> {
        let class = self.item_class(record)?;
        match self.criteria(&class, record, extra) {
            Some(criteria) => class.fetch_records(&criteria, &[]),
            None => Ok(RecordSet::default()),
        }
    }

    /// Count the items without materializing them.
    pub fn count(&self, record: &Record, extra: Option<&Criteria>) -> Result<usize> {
        let class = self.item_class(record)?;
        match self.criteria(&class, record, extra) {
            Some(criteria) => class.table()?.count_rows(&criteria),
            None => Ok(0),
        }
    }

    /// A transient item already linked to `record`.
    pub fn new_item(&self, record: &Record, mut values: Row) -> Result<Record> {
        let class = self.item_class(record)?;
        let id = record.id().cloned().ok_or_else(|| Error::InvalidState {
            class: record.class_name().to_string(),
            message: format!(
                "cannot create {} items before the record is saved",
                self.related_class
            ),
        })?;
        values.insert(self.link_column(&class), id);
        class.new_record(values)
    }

    /// Delete every item through its own lifecycle; returns how many went.
    pub fn delete_items(&self, record: &Record) -> Result<usize> {
        let mut deleted = 0;
        for mut item in self.items(record, None)? {
            if item.delete_record()? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

impl FieldBehavior for LineItemsField {
    fn type_name(&self) -> &'static str {
        "line_items"
    }

    fn column_type(&self) -> Option<ColumnType> {
        None
    }

    fn operations(&self, name: &str) -> Vec<(String, Operation)> {
        vec![
            (name.to_string(), Operation::Items(name.to_string())),
            (
                format!("count_{name}"),
                Operation::CountItems(name.to_string()),
            ),
            (format!("new_{name}"), Operation::NewItem(name.to_string())),
            (
                format!("delete_{name}"),
                Operation::DeleteItems(name.to_string()),
            ),
        ]
    }

    fn implied_hooks(&self, spec: &FieldSpec, config: &DboConfig) -> Vec<(HookEvent, Hook)> {
        let name = spec.name().to_string();
        match self.policy(config) {
            DeletePolicy::Manual => Vec::new(),
            DeletePolicy::Restrict => {
                let count = format!("count_{name}");
                let hook = Hook::new(format!("restrict_{name}"), move |record: &mut Record| {
                    let remaining = record.invoke(&count, &[])?.into_value();
                    if remaining.as_i64().unwrap_or(0) > 0 {
                        tracing::warn!(
                            class = record.class_name(),
                            id = %record.id().cloned().unwrap_or_default(),
                            field = %name,
                            remaining = %remaining,
                            "delete restricted by existing line items"
                        );
                        return Ok(false);
                    }
                    Ok(true)
                });
                vec![(HookEvent::PreDelete, hook)]
            }
            // Cascades run from `Record::delete_record` once the chain approves.
            DeletePolicy::Cascade => Vec::new(),
        }
    }
}

/// Another name for an existing method.
#[derive(Debug, Clone)]
pub struct AliasField {
    target: String,
}

impl AliasField {
    /// Delegate to `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// The delegated method.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl FieldBehavior for AliasField {
    fn type_name(&self) -> &'static str {
        "alias"
    }

    fn column_type(&self) -> Option<ColumnType> {
        None
    }

    fn operations(&self, name: &str) -> Vec<(String, Operation)> {
        vec![(name.to_string(), Operation::Alias(self.target.clone()))]
    }

    fn check(&self, spec: &FieldSpec, has_method: &dyn Fn(&str) -> bool) -> Result<()> {
        if self.target == spec.name() || !has_method(&self.target) {
            return Err(Error::config(format!(
                "alias `{}` targets unknown method `{}`",
                spec.name(),
                self.target
            )));
        }
        Ok(())
    }

    fn get(&self, _spec: &FieldSpec, record: &mut Record) -> Result<Value> {
        Ok(record.invoke(&self.target, &[])?.into_value())
    }

    fn set(&self, _spec: &FieldSpec, record: &mut Record, value: Value) -> Result<()> {
        record.invoke(&self.target, &[value])?;
        Ok(())
    }
}
