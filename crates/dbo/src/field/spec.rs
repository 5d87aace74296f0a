//! Declarative field specifications.

use std::sync::OnceLock;

use dbo_core::Column;

use super::{
    AliasField, CurrencyField, DeletePolicy, FieldKind, ForeignKeyField, GenericField, LineItemsField,
    NumberField, SavedTotalField, StringField, SubclassNameField, TemporalField, TemporalUnit,
    UniqueCodeField,
};
use crate::class::RecordClass;
use crate::hooks::HookEvent;

/// Attach a call to a generated method onto a lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookBinding {
    /// When to call.
    pub event: HookEvent,
    /// Method name in the class's operation table.
    pub method: String,
}

/// Column-derived validation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnTraits {
    /// The field must hold a value.
    pub required: bool,
    /// Maximum length in characters.
    pub length: Option<usize>,
}

/// Metadata describing one record attribute and the behavior it generates.
///
/// Built with a kind constructor plus attribute setters:
///
/// ```
/// use dbo::{FieldSpec, HookEvent};
///
/// let name = FieldSpec::string("name").length(64).required(true);
/// let created = FieldSpec::timestamp("created").created();
/// assert_eq!(created.hooks()[0].event, HookEvent::PostNew);
/// assert_eq!(name.type_name(), "string");
/// ```
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    required: Option<bool>,
    length: Option<usize>,
    hash_key: Option<String>,
    default_format: Option<String>,
    hooks: Vec<HookBinding>,
    detected: OnceLock<ColumnTraits>,
}

impl FieldSpec {
    /// Create a spec of any kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: None,
            length: None,
            hash_key: None,
            default_format: None,
            hooks: Vec::new(),
            detected: OnceLock::new(),
        }
    }

    /// `generic` field.
    pub fn generic(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Generic(GenericField))
    }

    /// `string` field.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String(StringField))
    }

    /// `number` field.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number(NumberField))
    }

    /// `timestamp` field (Unix seconds).
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Temporal(TemporalField::new(TemporalUnit::Timestamp)),
        )
    }

    /// `julian_day` field (Julian Day Number).
    pub fn julian_day(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Temporal(TemporalField::new(TemporalUnit::JulianDay)),
        )
    }

    /// `currency_uspennies` field.
    pub fn currency_uspennies(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Currency(CurrencyField))
    }

    /// `saved_total` field recomputed through `init_{name}`.
    pub fn saved_total(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::SavedTotal(SavedTotalField::new()))
    }

    /// `saved_total_uspennies` field; also recomputes when nothing is stored.
    pub fn saved_total_uspennies(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::SavedTotal(SavedTotalField::pennies()))
    }

    /// `unique_code` field with default generation options.
    pub fn unique_code(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::UniqueCode(UniqueCodeField::default()))
    }

    /// `foreign_key` field referencing `related_class`.
    pub fn foreign_key(name: impl Into<String>, related_class: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::ForeignKey(ForeignKeyField::new(related_class)),
        )
    }

    /// `line_items` field: records of `related_class` whose foreign key
    /// `related_field` points here.
    pub fn line_items(
        name: impl Into<String>,
        related_class: impl Into<String>,
        related_field: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            FieldKind::LineItems(LineItemsField::new(related_class, related_field)),
        )
    }

    /// `alias` field delegating to `target`.
    pub fn alias(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Alias(AliasField::new(target)))
    }

    /// `subclass_name` discriminator field.
    pub fn subclass_name(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::SubclassName(SubclassNameField::default()),
        )
    }

    /// Set the required flag.
    pub fn required(mut self, value: bool) -> Self {
        self.required = Some(value);
        self
    }

    /// Set the maximum length.
    pub fn length(mut self, value: usize) -> Self {
        self.length = Some(value);
        self
    }

    /// Store the value under `key` instead of the derived storage key.
    pub fn hash_key(mut self, key: impl Into<String>) -> Self {
        self.hash_key = Some(key.into());
        self
    }

    /// Display format used by `*_readable` when none is passed.
    pub fn default_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = Some(format.into());
        self
    }

    /// Call `method` when `event` fires.
    pub fn hook(mut self, event: HookEvent, method: impl Into<String>) -> Self {
        self.hooks.push(HookBinding {
            event,
            method: method.into(),
        });
        self
    }

    /// Delete policy of a `line_items` field. Ignored by other kinds.
    pub fn on_delete(mut self, policy: DeletePolicy) -> Self {
        if let FieldKind::LineItems(items) = &self.kind {
            self.kind = FieldKind::LineItems(items.clone().on_delete(policy));
        }
        self
    }

    /// Forward `method` through a `foreign_key` field. Ignored by other kinds.
    pub fn forward(mut self, method: impl Into<String>) -> Self {
        if let FieldKind::ForeignKey(fk) = &self.kind {
            self.kind = FieldKind::ForeignKey(fk.clone().forward(method));
        }
        self
    }

    /// Temporal "created" interface: touch on construction.
    pub fn created(self) -> Self {
        let touch = format!("touch_{}", self.name);
        self.hook(HookEvent::PostNew, touch)
    }

    /// Temporal "updated" interface: touch before every write.
    pub fn updated(self) -> Self {
        let touch = format!("touch_{}", self.name);
        self.hook(HookEvent::PreInsert, touch.clone())
            .hook(HookEvent::PreUpdate, touch)
    }

    /// Field name, unique within the declaring class.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Declarative type name.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Explicit required flag, if declared.
    pub fn declared_required(&self) -> Option<bool> {
        self.required
    }

    /// Explicit length, if declared.
    pub fn declared_length(&self) -> Option<usize> {
        self.length
    }

    /// Default display format, if declared.
    pub fn format(&self) -> Option<&str> {
        self.default_format.as_deref()
    }

    /// Declared hook bindings, in order.
    pub fn hooks(&self) -> &[HookBinding] {
        &self.hooks
    }

    /// Key the value lives under in the record and the table.
    pub fn storage_key(&self) -> String {
        self.hash_key
            .clone()
            .unwrap_or_else(|| self.kind.behavior().storage_key(&self.name))
    }

    /// Required/length limits, filling unspecified ones from the owning
    /// table's column metadata.
    ///
    /// The table lookup happens once; its result is cached in this `FieldSpec`. When
    /// no table can be consulted yet the fixed defaults apply and nothing is
    /// cached, so a later call can still pick up real metadata.
    pub fn column_traits(&self, class: &RecordClass) -> ColumnTraits {
        if let (Some(required), Some(length)) = (self.required, self.length) {
            return ColumnTraits {
                required,
                length: Some(length),
            };
        }
        let detected = match self.detected.get() {
            Some(traits) => Some(*traits),
            None => self.detect(class),
        };
        let base = detected.unwrap_or_default();
        ColumnTraits {
            required: self.required.unwrap_or(base.required),
            length: self.length.or(base.length),
        }
    }

    fn detect(&self, class: &RecordClass) -> Option<ColumnTraits> {
        let table = class.table().ok()?;
        let columns = table.column_set().ok()?;
        let key = self.storage_key();
        let traits = columns.get(&key).map_or_else(ColumnTraits::default, |col| ColumnTraits {
            required: col.required,
            length: col.length,
        });
        tracing::debug!(
            class = class.name(),
            field = %self.name,
            required = traits.required,
            length = ?traits.length,
            "detected column traits"
        );
        Some(*self.detected.get_or_init(|| traits))
    }

    /// Physical column for schema generation, if the kind stores one.
    pub fn column(&self, class: &RecordClass) -> Option<Column> {
        let column_type = self.kind.behavior().column_type()?;
        let traits = self.column_traits(class);
        Some(
            Column::new(self.storage_key(), column_type)
                .required(traits.required)
                .length_opt(traits.length),
        )
    }
}
