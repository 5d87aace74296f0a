//! Records: one row's worth of values bound to a record class.
//!
//! # Lifecycle
//!
//! ```text
//! new_record ──► Transient ──insert/save──► Persisted ──delete──► Deleted
//!                                  ▲            │
//!                                  └─update/save┘
//! ```
//!
//! The state is never stored separately: a record is persisted when its
//! primary key holds a real value (not empty, not the `"new"` sentinel). Only
//! the terminal `Deleted` state is a flag, and every operation on a deleted
//! record fails with [`Error::InvalidState`].

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use dbo_core::{Criteria, Error, FieldValidationError, Result, Row, Value};

use crate::class::RecordClass;
use crate::field::{DeletePolicy, FieldKind, FieldSpec};
use crate::hooks::{HookEvent, run_chain};
use crate::method::{MethodResult, Operation};
use crate::record_set::RecordSet;

/// Where a record is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Constructed, not yet inserted.
    Transient,
    /// Backed by a row.
    Persisted,
    /// Its row was deleted.
    Deleted,
}

/// One row of a record class.
#[derive(Clone)]
pub struct Record {
    class: Arc<RecordClass>,
    values: Row,
    deleted: bool,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("class", &self.class.name())
            .field("values", &self.values)
            .field("deleted", &self.deleted)
            .finish()
    }
}

impl Record {
    pub(crate) fn transient(class: Arc<RecordClass>, values: Row) -> Self {
        Self {
            class,
            values,
            deleted: false,
        }
    }

    /// Rehydrate a fetched row, picking the subclass named by its
    /// discriminator, and run `post_fetch`.
    pub(crate) fn fetched(class: &Arc<RecordClass>, row: Row) -> Result<Self> {
        let mut record = Self::transient(class.class_for_row(&row), row);
        record.run_hooks(HookEvent::PostFetch)?;
        Ok(record)
    }

    pub(crate) fn run_hooks(&mut self, event: HookEvent) -> Result<bool> {
        let class = Arc::clone(&self.class);
        run_chain(class.hook_chain(event), event, self)
    }

    /// The record's class.
    pub fn class(&self) -> &Arc<RecordClass> {
        &self.class
    }

    /// The record's class name.
    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Every stored value.
    pub fn values(&self) -> &Row {
        &self.values
    }

    /// Stored value under `key`, bypassing field behavior.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Stored value under `key`, or null.
    pub fn raw_value(&self, key: &str) -> Value {
        self.values.get(key).cloned().unwrap_or_default()
    }

    /// Store `value` under `key`, bypassing field behavior.
    pub fn set_raw(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Primary key, when the record is persisted.
    pub fn id(&self) -> Option<&Value> {
        let config = self.class.config();
        self.values
            .get(&config.primary_key)
            .filter(|v| !v.is_empty() && v.as_str() != Some(config.new_key_sentinel.as_str()))
    }

    /// True when the primary key holds a real value.
    pub fn has_id(&self) -> bool {
        self.id().is_some()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RecordState {
        if self.deleted {
            RecordState::Deleted
        } else if self.has_id() {
            RecordState::Persisted
        } else {
            RecordState::Transient
        }
    }

    fn ensure_live(&self, action: &str) -> Result<()> {
        if self.deleted {
            return Err(Error::InvalidState {
                class: self.class_name().to_string(),
                message: format!("cannot {action} a deleted record"),
            });
        }
        Ok(())
    }

    fn require_id(&self, action: &str) -> Result<Value> {
        self.id().cloned().ok_or_else(|| Error::InvalidState {
            class: self.class_name().to_string(),
            message: format!("cannot {action} a record that was never saved"),
        })
    }

    fn field_spec(&self, name: &str) -> Result<Arc<FieldSpec>> {
        self.class.field(name).cloned().ok_or_else(|| {
            Error::config(format!("{} has no field `{name}`", self.class_name()))
        })
    }

    fn wrong_kind(&self, spec: &FieldSpec, expected: &str) -> Error {
        Error::config(format!(
            "field `{}` of {} is a {} field, not {expected}",
            spec.name(),
            self.class_name(),
            spec.type_name()
        ))
    }

    // --- field access -----------------------------------------------------

    /// Read a field through its kind. Names that are not fields read the
    /// stored value directly.
    pub fn get(&mut self, name: &str) -> Result<Value> {
        let spec = self.class.field(name).cloned();
        match spec {
            Some(spec) => spec.kind().behavior().get(&spec, self),
            None => Ok(self.raw_value(name)),
        }
    }

    /// Write a field through its kind. Names that are not fields are stored
    /// as ad hoc values.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.ensure_live("modify")?;
        let value = value.into();
        let spec = self.class.field(name).cloned();
        match spec {
            Some(spec) => spec.kind().behavior().set(&spec, self, value),
            None => {
                self.set_raw(name, value);
                Ok(())
            }
        }
    }

    /// Validation diagnostic for one field.
    pub fn invalid(&self, name: &str) -> Result<Option<FieldValidationError>> {
        let spec = self.field_spec(name)?;
        spec.kind().behavior().invalid(&spec, self)
    }

    /// Every field's diagnostic, in field order.
    pub fn validate(&self) -> Result<Vec<FieldValidationError>> {
        let mut problems = Vec::new();
        for spec in self.class.fields() {
            if let Some(diag) = spec.kind().behavior().invalid(spec, self)? {
                problems.push(diag);
            }
        }
        Ok(problems)
    }

    /// Values as a JSON object.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.values).map_err(|e| Error::Custom(e.to_string()))
    }

    // --- generated operations ---------------------------------------------

    /// Call any generated or class-defined method by name.
    pub fn invoke(&mut self, name: &str, args: &[Value]) -> Result<MethodResult> {
        let class = Arc::clone(&self.class);
        let op = class.operation(name).ok_or_else(|| {
            Error::config(format!("{} has no method `{name}`", class.name()))
        })?;
        tracing::trace!(class = class.name(), method = name, "invoke");

        match op {
            Operation::Get(field) => match args.first() {
                Some(value) => self.set(field, value.clone()).map(|()| MethodResult::Unit),
                None => self.get(field).map(MethodResult::Value),
            },
            Operation::Invalid(field) => self.invalid(field).map(MethodResult::Invalid),
            Operation::Readable(field) => {
                let spec = self.field_spec(field)?;
                match (spec.kind(), args.first()) {
                    (FieldKind::Currency(_), Some(text)) => {
                        self.set_readable(field, &text.to_text())?;
                        Ok(MethodResult::Unit)
                    }
                    (_, format) => {
                        let format = format.and_then(Value::as_str);
                        self.readable(field, format).map(MethodResult::Text)
                    }
                }
            }
            Operation::Touch(field) => self.touch(field).map(|()| MethodResult::Unit),
            Operation::Object(field) => self.temporal(field).map(MethodResult::Time),
            Operation::Reset(field) => self.reset_total(field).map(MethodResult::Value),
            Operation::Difference(field) => self.total_difference(field).map(MethodResult::Value),
            Operation::AssignCode(field) => self.assign_code(field).map(MethodResult::Value),
            Operation::RelatedId(field) => {
                let key = self.field_spec(field)?.storage_key();
                match args.first() {
                    Some(id) => {
                        self.ensure_live("modify")?;
                        self.set_raw(key, id.clone());
                        Ok(MethodResult::Unit)
                    }
                    None => Ok(MethodResult::Value(self.raw_value(&key))),
                }
            }
            Operation::Related(field) => match args.first() {
                Some(id) => {
                    self.ensure_live("modify")?;
                    let key = self.field_spec(field)?.storage_key();
                    self.set_raw(key, id.clone());
                    Ok(MethodResult::Unit)
                }
                None => Ok(MethodResult::Record(self.related(field)?.map(Box::new))),
            },
            Operation::RequiredRelated(field) => Ok(MethodResult::Record(Some(Box::new(
                self.required_related(field)?,
            )))),
            Operation::Items(field) => self.line_items(field, None).map(MethodResult::Records),
            Operation::CountItems(field) => self
                .count_line_items(field, None)
                .map(|n| MethodResult::Value(Value::from(n))),
            Operation::NewItem(field) => {
                let item = self.new_line_item(field, Row::new())?;
                Ok(MethodResult::Record(Some(Box::new(item))))
            }
            Operation::DeleteItems(field) => self
                .delete_line_items(field)
                .map(|n| MethodResult::Value(Value::from(n))),
            Operation::Alias(target) => self.invoke(target, args),
            Operation::Forward { relation, method } => match self.related(relation)? {
                Some(mut related) => related.invoke(method, args),
                None => Ok(MethodResult::Value(Value::Null)),
            },
            Operation::Custom(method) => {
                let f = class.custom_method(method).ok_or_else(|| {
                    Error::config(format!("{} has no method `{method}`", class.name()))
                })?;
                f(self, args).map(MethodResult::Value)
            }
        }
    }

    /// Call a method and collapse the result into a scalar.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        self.invoke(name, args).map(MethodResult::into_value)
    }

    /// Set a temporal field to now.
    pub fn touch(&mut self, name: &str) -> Result<()> {
        self.ensure_live("modify")?;
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::Temporal(field) => {
                field.touch(&spec, self);
                Ok(())
            }
            _ => Err(self.wrong_kind(&spec, "a timestamp or julian_day")),
        }
    }

    /// Display form of a field. `format` applies to temporal fields.
    pub fn readable(&self, name: &str, format: Option<&str>) -> Result<String> {
        let spec = self.field_spec(name)?;
        Ok(match spec.kind() {
            FieldKind::Temporal(field) => field.readable(&spec, self, format),
            FieldKind::Number(field) => field.readable(&spec, self),
            FieldKind::Currency(field) => field.readable(&spec, self),
            _ => self
                .raw(&spec.storage_key())
                .map(Value::to_text)
                .unwrap_or_default(),
        })
    }

    /// Parse a display-form value into a field. Currency fields read
    /// `$1,234.56`; other kinds behave like [`set`](Self::set).
    pub fn set_readable(&mut self, name: &str, text: &str) -> Result<()> {
        self.ensure_live("modify")?;
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::Currency(field) => {
                field.set_readable(&spec, self, text);
                Ok(())
            }
            _ => self.set(name, text),
        }
    }

    /// Parsed value of a temporal field.
    pub fn temporal(&self, name: &str) -> Result<Option<NaiveDateTime>> {
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::Temporal(field) => Ok(field.object(&spec, self)),
            _ => Err(self.wrong_kind(&spec, "a timestamp or julian_day")),
        }
    }

    /// Recompute and store a saved total.
    pub fn reset_total(&mut self, name: &str) -> Result<Value> {
        self.ensure_live("modify")?;
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::SavedTotal(field) => field.reset(&spec, self),
            _ => Err(self.wrong_kind(&spec, "a saved_total")),
        }
    }

    /// Recomputed saved total minus the stored one.
    pub fn total_difference(&mut self, name: &str) -> Result<Value> {
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::SavedTotal(field) => field.difference(&spec, self),
            _ => Err(self.wrong_kind(&spec, "a saved_total")),
        }
    }

    /// Generate and store a fresh unique code.
    pub fn assign_code(&mut self, name: &str) -> Result<Value> {
        self.ensure_live("modify")?;
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::UniqueCode(field) => field.assign(&spec, self),
            _ => Err(self.wrong_kind(&spec, "a unique_code")),
        }
    }

    /// The record a foreign key points at.
    pub fn related(&self, name: &str) -> Result<Option<Record>> {
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::ForeignKey(field) => field.related(&spec, self),
            _ => Err(self.wrong_kind(&spec, "a foreign_key")),
        }
    }

    /// Point a foreign key at `related` (copying its id), or clear it.
    pub fn set_related(&mut self, name: &str, related: Option<&Record>) -> Result<()> {
        self.ensure_live("modify")?;
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::ForeignKey(field) => {
                field.set_related(&spec, self, related);
                Ok(())
            }
            _ => Err(self.wrong_kind(&spec, "a foreign_key")),
        }
    }

    /// The record a foreign key points at, or [`Error::NotFound`].
    pub fn required_related(&self, name: &str) -> Result<Record> {
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::ForeignKey(field) => field.required_related(&spec, self),
            _ => Err(self.wrong_kind(&spec, "a foreign_key")),
        }
    }

    /// Line items, optionally narrowed by `extra`.
    pub fn line_items(&self, name: &str, extra: Option<&Criteria>) -> Result<RecordSet> {
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::LineItems(field) => field.items(self, extra),
            _ => Err(self.wrong_kind(&spec, "a line_items")),
        }
    }

    /// Number of line items, optionally narrowed by `extra`.
    pub fn count_line_items(&self, name: &str, extra: Option<&Criteria>) -> Result<usize> {
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::LineItems(field) => field.count(self, extra),
            _ => Err(self.wrong_kind(&spec, "a line_items")),
        }
    }

    /// A transient line item linked to this record.
    pub fn new_line_item(&self, name: &str, values: Row) -> Result<Record> {
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::LineItems(field) => field.new_item(self, values),
            _ => Err(self.wrong_kind(&spec, "a line_items")),
        }
    }

    /// Delete every line item through its own lifecycle.
    pub fn delete_line_items(&self, name: &str) -> Result<usize> {
        let spec = self.field_spec(name)?;
        match spec.kind() {
            FieldKind::LineItems(field) => field.delete_items(self),
            _ => Err(self.wrong_kind(&spec, "a line_items")),
        }
    }

    // --- persistence --------------------------------------------------------

    /// Reload the values from the table.
    #[tracing::instrument(level = "debug", skip(self), fields(class = %self.class.name()))]
    pub fn refetch_record(&mut self) -> Result<()> {
        self.ensure_live("refetch")?;
        let id = self.require_id("refetch")?;
        let row = self
            .class
            .table()?
            .fetch_id(&id)?
            .ok_or_else(|| Error::not_found(self.class_name(), format!("id {id}")))?;
        self.values = row;
        self.run_hooks(HookEvent::PostFetch)?;
        Ok(())
    }

    /// Insert as a new row: `pre_insert`, write, `post_insert`.
    #[tracing::instrument(level = "debug", skip(self), fields(class = %self.class.name()))]
    pub fn insert_record(&mut self) -> Result<()> {
        self.ensure_live("insert")?;
        self.run_hooks(HookEvent::PreInsert)?;
        let id = self.class.table()?.insert_row(&mut self.values)?;
        tracing::info!(class = self.class_name(), id = %id, "inserted record");
        self.run_hooks(HookEvent::PostInsert)?;
        Ok(())
    }

    /// Write the values to the existing row: `pre_update`, write,
    /// `post_update`.
    #[tracing::instrument(level = "debug", skip(self), fields(class = %self.class.name()))]
    pub fn update_record(&mut self) -> Result<()> {
        self.ensure_live("update")?;
        self.require_id("update")?;
        self.run_hooks(HookEvent::PreUpdate)?;
        let touched = self.class.table()?.update_row(&self.values)?;
        tracing::debug!(class = self.class_name(), touched, "updated record");
        self.run_hooks(HookEvent::PostUpdate)?;
        Ok(())
    }

    /// Insert when unsaved, update otherwise.
    pub fn save_record(&mut self) -> Result<()> {
        if self.has_id() {
            self.update_record()
        } else {
            self.insert_record()
        }
    }

    /// Delete the row. Returns `false` when a `pre_delete` hook vetoed.
    #[tracing::instrument(level = "debug", skip(self), fields(class = %self.class.name()))]
    pub fn delete_record(&mut self) -> Result<bool> {
        self.ensure_live("delete")?;
        let id = self.require_id("delete")?;
        if !self.run_hooks(HookEvent::PreDelete)? {
            tracing::info!(class = self.class_name(), id = %id, "delete vetoed");
            return Ok(false);
        }
        self.cascade_line_items()?;
        self.class.table()?.delete_id(&id)?;
        self.deleted = true;
        tracing::info!(class = self.class_name(), id = %id, "deleted record");
        self.run_hooks(HookEvent::PostDelete)?;
        Ok(true)
    }

    fn cascade_line_items(&self) -> Result<()> {
        let config = self.class.config();
        for spec in self.class.fields() {
            if let FieldKind::LineItems(field) = spec.kind() {
                if field.policy(config) == DeletePolicy::Cascade {
                    let removed = field.delete_items(self)?;
                    tracing::debug!(
                        class = self.class_name(),
                        field = spec.name(),
                        removed,
                        "cascaded delete"
                    );
                }
            }
        }
        Ok(())
    }

    /// Transient copy without the primary key or unique codes. No hooks run.
    pub fn clone_record(&self) -> Result<Record> {
        self.ensure_live("clone")?;
        let mut values = self.values.clone();
        values.remove(&self.class.config().primary_key);
        for spec in self.class.fields() {
            if matches!(spec.kind(), FieldKind::UniqueCode(_)) {
                values.remove(&spec.storage_key());
            }
        }
        Ok(Self::transient(Arc::clone(&self.class), values))
    }
}
