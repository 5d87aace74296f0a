//! Record classes and the catalog that owns them.
//!
//! A [`RecordClass`] is built once from its field declarations, parents,
//! methods and hooks. Building resolves everything that can be resolved up
//! front: the merged field list, the operation table, the effective hook
//! chains. After that the class is immutable apart from its table binding.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use dbo_core::{Column, ColumnSet, ColumnType, Criteria, Error, OrderBy, Result, Row, Value};

use crate::config::DboConfig;
use crate::field::{FieldKind, FieldRegistry, FieldSpec};
use crate::hooks::{Hook, HookEvent, HookSet};
use crate::method::{MethodFn, Operation};
use crate::record::Record;
use crate::record_set::RecordSet;
use crate::table::Table;

/// Registry of record classes, looked up by name.
///
/// Relations and discriminators name classes; the catalog resolves those
/// names. Every class built against a catalog shares its [`DboConfig`].
#[derive(Debug)]
pub struct Catalog {
    config: Arc<DboConfig>,
    classes: RwLock<BTreeMap<String, Arc<RecordClass>>>,
}

impl Catalog {
    /// Empty catalog with default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(DboConfig::default())
    }

    /// Empty catalog with `config`.
    pub fn with_config(config: DboConfig) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            classes: RwLock::new(BTreeMap::new()),
        })
    }

    /// Shared configuration.
    pub fn config(&self) -> &Arc<DboConfig> {
        &self.config
    }

    /// Start declaring a class named `name`.
    pub fn define(&self, name: impl Into<String>) -> RecordClassBuilder {
        RecordClassBuilder::new(name)
    }

    /// The class named `name`, if registered.
    pub fn get(&self, name: &str) -> Option<Arc<RecordClass>> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// The class named `name`.
    pub fn class(&self, name: &str) -> Result<Arc<RecordClass>> {
        self.get(name)
            .ok_or_else(|| Error::config(format!("unknown record class `{name}`")))
    }

    /// Names of every registered class.
    pub fn class_names(&self) -> Vec<String> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn register(&self, class: Arc<RecordClass>) -> Result<()> {
        let mut classes = self.classes.write().unwrap_or_else(PoisonError::into_inner);
        if classes.contains_key(class.name()) {
            return Err(Error::config(format!(
                "record class `{}` is already defined",
                class.name()
            )));
        }
        classes.insert(class.name().to_string(), class);
        Ok(())
    }
}

/// Declaration of a record class.
///
/// ```
/// use dbo::{Catalog, FieldSpec, Value};
///
/// let catalog = Catalog::new();
/// let artist = catalog
///     .define("Artist")
///     .field(FieldSpec::string("name").length(64))
///     .method("shout", |record, _args| {
///         Ok(Value::from(record.get("name")?.to_text().to_uppercase()))
///     })
///     .build(&catalog)
///     .unwrap();
///
/// assert!(artist.has_method("name_invalid"));
/// assert!(artist.has_method("shout"));
/// ```
pub struct RecordClassBuilder {
    name: String,
    parents: Vec<String>,
    fields: Vec<FieldSpec>,
    methods: Vec<(String, MethodFn)>,
    hooks: Vec<(HookEvent, Hook)>,
}

impl RecordClassBuilder {
    /// Start a class named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Inherit from an already-built class.
    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parents.push(name.into());
        self
    }

    /// Declare a field.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Declare a method. Overrides a generated operation of the same name.
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut Record, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.push((name.into(), Arc::new(method)));
        self
    }

    /// Add a hook for `event`, after any field-implied hooks.
    pub fn hook<F>(mut self, event: HookEvent, hook: F) -> Self
    where
        F: Fn(&mut Record) -> Result<bool> + Send + Sync + 'static,
    {
        let label = format!("{}.{event}#{}", self.name, self.hooks.len());
        self.hooks.push((event, Hook::new(label, hook)));
        self
    }

    /// Resolve and register the class.
    pub fn build(self, catalog: &Arc<Catalog>) -> Result<Arc<RecordClass>> {
        let mut registry = FieldRegistry::new();
        for spec in self.fields {
            registry.register(spec)?;
        }

        let parents = self
            .parents
            .iter()
            .map(|p| catalog.class(p))
            .collect::<Result<Vec<_>>>()?;
        let ancestors = breadth_first_ancestors(&parents);

        let fields = FieldRegistry::merge(
            std::iter::once(&registry).chain(ancestors.iter().map(|a| &a.registry)),
        );

        let mut methods: BTreeMap<String, MethodFn> = BTreeMap::new();
        for (name, method) in self.methods {
            methods.insert(name, method);
        }

        let mut operations = BTreeMap::new();
        for spec in &fields {
            for (name, op) in spec.kind().behavior().operations(spec.name()) {
                operations.insert(name, op);
            }
        }
        let custom_names = methods
            .keys()
            .cloned()
            .chain(ancestors.iter().flat_map(|a| a.methods.keys().cloned()));
        for name in custom_names.collect::<Vec<_>>() {
            operations.insert(name.clone(), Operation::Custom(name));
        }

        let has_method = |name: &str| operations.contains_key(name);
        for spec in &fields {
            spec.kind().behavior().check(spec, &has_method)?;
        }
        check_alias_cycles(&self.name, &operations)?;

        let mut own_hooks = HookSet::new();
        for spec in registry.class_fields() {
            for (event, hook) in spec.kind().behavior().implied_hooks(spec, catalog.config()) {
                own_hooks.add(event, hook);
            }
            for binding in spec.hooks() {
                if !has_method(&binding.method) {
                    return Err(Error::config(format!(
                        "field `{}` of {} binds {} to unknown method `{}`",
                        spec.name(),
                        self.name,
                        binding.event,
                        binding.method
                    )));
                }
                let method = binding.method.clone();
                let hook = Hook::new(method.clone(), move |record: &mut Record| {
                    Ok(!record.invoke(&method, &[])?.is_veto())
                });
                own_hooks.add(binding.event, hook);
            }
        }
        for (event, hook) in self.hooks {
            own_hooks.add(event, hook);
        }

        let mut chains = HookSet::new();
        for ancestor in ancestors.iter().rev() {
            chains.extend(&ancestor.hooks);
        }
        chains.extend(&own_hooks);

        let class = Arc::new(RecordClass {
            name: self.name,
            parents,
            ancestors,
            registry,
            fields,
            operations,
            methods,
            hooks: own_hooks,
            chains,
            table: RwLock::new(None),
            catalog: Arc::downgrade(catalog),
            config: Arc::clone(catalog.config()),
        });
        catalog.register(Arc::clone(&class))?;
        tracing::debug!(
            class = class.name(),
            fields = class.fields.len(),
            operations = class.operations.len(),
            hooks = class.chains.len(),
            "built record class"
        );
        Ok(class)
    }
}

fn breadth_first_ancestors(parents: &[Arc<RecordClass>]) -> Vec<Arc<RecordClass>> {
    let mut seen = BTreeSet::new();
    let mut order = Vec::new();
    let mut queue: VecDeque<Arc<RecordClass>> = parents.iter().cloned().collect();
    while let Some(class) = queue.pop_front() {
        if !seen.insert(class.name.clone()) {
            continue;
        }
        queue.extend(class.parents.iter().cloned());
        order.push(class);
    }
    order
}

fn check_alias_cycles(class: &str, operations: &BTreeMap<String, Operation>) -> Result<()> {
    for start in operations.keys() {
        let mut seen = BTreeSet::new();
        let mut current = start.as_str();
        while let Some(Operation::Alias(target)) = operations.get(current) {
            if !seen.insert(current) {
                return Err(Error::config(format!(
                    "alias cycle in {class} through `{start}`"
                )));
            }
            current = target.as_str();
        }
    }
    Ok(())
}

/// A built record class.
pub struct RecordClass {
    name: String,
    parents: Vec<Arc<RecordClass>>,
    ancestors: Vec<Arc<RecordClass>>,
    registry: FieldRegistry,
    fields: Vec<Arc<FieldSpec>>,
    operations: BTreeMap<String, Operation>,
    methods: BTreeMap<String, MethodFn>,
    hooks: HookSet,
    chains: HookSet,
    table: RwLock<Option<Arc<Table>>>,
    catalog: Weak<Catalog>,
    config: Arc<DboConfig>,
}

impl fmt::Debug for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordClass")
            .field("name", &self.name)
            .field("parents", &self.parent_names())
            .field("fields", &self.fields.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl RecordClass {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct parents, in declaration order.
    pub fn parent_names(&self) -> Vec<&str> {
        self.parents.iter().map(|p| p.name()).collect()
    }

    /// Every ancestor, breadth-first, nearest first.
    pub fn ancestor_names(&self) -> Vec<&str> {
        self.ancestors.iter().map(|a| a.name()).collect()
    }

    /// True if this class is `name` or inherits from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.ancestors.iter().any(|a| a.name == name)
    }

    /// Shared configuration.
    pub fn config(&self) -> &DboConfig {
        &self.config
    }

    /// Fields declared on this class only.
    pub fn class_fields(&self) -> &[Arc<FieldSpec>] {
        self.registry.class_fields()
    }

    /// Inheritance-merged fields.
    pub fn fields(&self) -> &[Arc<FieldSpec>] {
        &self.fields
    }

    /// Merged field named `name`.
    pub fn field(&self, name: &str) -> Option<&Arc<FieldSpec>> {
        self.fields.iter().find(|s| s.name() == name)
    }

    /// The operation registered under `name`.
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Every operation name.
    pub fn method_names(&self) -> Vec<&str> {
        self.operations.keys().map(String::as_str).collect()
    }

    /// True if `name` can be invoked on records of this class.
    pub fn has_method(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// The class-defined method `name`, searching the ancestry.
    pub fn custom_method(&self, name: &str) -> Option<MethodFn> {
        self.methods.get(name).cloned().or_else(|| {
            self.ancestors
                .iter()
                .find_map(|a| a.methods.get(name).cloned())
        })
    }

    /// Hooks declared on this class for `event`.
    pub fn own_hooks(&self, event: HookEvent) -> &[Hook] {
        self.hooks.get(event)
    }

    /// The full chain run for `event`, most distant ancestor first.
    pub fn hook_chain(&self, event: HookEvent) -> &[Hook] {
        self.chains.get(event)
    }

    /// Bind the class to `table`. Subclasses without their own binding use it.
    pub fn bind_table(&self, table: Arc<Table>) {
        tracing::debug!(class = %self.name, table = table.name(), "bound table");
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = Some(table);
    }

    fn own_table(&self) -> Option<Arc<Table>> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The table records of this class live in.
    pub fn table(&self) -> Result<Arc<Table>> {
        self.own_table()
            .or_else(|| self.ancestors.iter().find_map(|a| a.own_table()))
            .ok_or_else(|| Error::config(format!("no table bound for record class `{}`", self.name)))
    }

    /// Look up another class in the same catalog.
    pub fn resolve_class(&self, name: &str) -> Result<Arc<RecordClass>> {
        self.catalog
            .upgrade()
            .ok_or_else(|| Error::config(format!("catalog of `{}` was dropped", self.name)))?
            .class(name)
    }

    /// Column definitions for `table`: the primary key first, then one column
    /// per stored field in merged order.
    pub fn field_columns(&self, table: &str) -> ColumnSet {
        let pk = &self.config.primary_key;
        let mut columns = ColumnSet::new(table);
        columns.push(Column::new(pk.as_str(), ColumnType::Int).primary_key());
        for spec in &self.fields {
            if spec.storage_key() == *pk {
                continue;
            }
            if let Some(column) = spec.column(self) {
                columns.push(column);
            }
        }
        columns
    }

    /// Construct a transient record and run `post_new`.
    pub fn new_record(self: &Arc<Self>, values: Row) -> Result<Record> {
        let mut record = Record::transient(Arc::clone(self), values);
        record.run_hooks(HookEvent::PostNew)?;
        Ok(record)
    }

    /// Class a fetched row should be rehydrated as.
    ///
    /// Consults the first discriminator field. A value naming an unknown
    /// class, or one that does not inherit from this class, keeps this class.
    pub fn class_for_row(self: &Arc<Self>, row: &Row) -> Arc<RecordClass> {
        let discriminator = self.fields.iter().find_map(|spec| match spec.kind() {
            FieldKind::SubclassName(field) => Some((spec, field)),
            _ => None,
        });
        let Some((spec, field)) = discriminator else {
            return Arc::clone(self);
        };
        let Some(stored) = row.get(&spec.storage_key()).and_then(Value::as_str) else {
            return Arc::clone(self);
        };
        let target = field.class_for_value(stored);
        if target == self.name {
            return Arc::clone(self);
        }
        match self.resolve_class(target) {
            Ok(class) if class.is_a(self.name()) => class,
            _ => {
                tracing::warn!(
                    class = %self.name,
                    discriminator = stored,
                    "discriminator names no subclass; keeping fetching class"
                );
                Arc::clone(self)
            }
        }
    }

    /// Fetch matching records in `order`.
    pub fn fetch_records(self: &Arc<Self>, criteria: &Criteria, order: &[OrderBy]) -> Result<RecordSet> {
        let rows = self.table()?.fetch_select(criteria, order)?;
        rows.into_iter()
            .map(|row| Record::fetched(self, row))
            .collect::<Result<Vec<_>>>()
            .map(RecordSet::new)
    }

    /// Fetch a single record. More than one match logs a warning and the
    /// first is returned.
    pub fn fetch_one(self: &Arc<Self>, criteria: &Criteria) -> Result<Option<Record>> {
        let found = self.fetch_records(criteria, &[])?;
        if found.len() > 1 {
            tracing::warn!(
                class = %self.name,
                criteria = %criteria,
                matches = found.len(),
                "fetch_one matched more than one row; using the first"
            );
        }
        Ok(found.into_iter().next())
    }

    /// Fetch by primary key.
    pub fn fetch_id(self: &Arc<Self>, id: &Value) -> Result<Option<Record>> {
        self.fetch_one(&Criteria::eq(self.config.primary_key.as_str(), id.clone()))
    }

    /// Fetch every record, by primary key.
    pub fn fetch_all(self: &Arc<Self>) -> Result<RecordSet> {
        self.fetch_records(
            &Criteria::All,
            &[OrderBy::asc(self.config.primary_key.as_str())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;

    fn names(class: &RecordClass) -> Vec<&str> {
        class.fields().iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_unknown_parent_is_config_error() {
        let catalog = Catalog::new();
        let err = catalog.define("Child").parent("Nope").build(&catalog).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let catalog = Catalog::new();
        catalog.define("A").build(&catalog).unwrap();
        assert!(catalog.define("A").build(&catalog).is_err());
        assert_eq!(catalog.class_names(), vec!["A"]);
    }

    #[test]
    fn test_diamond_ancestry_is_breadth_first() {
        let catalog = Catalog::new();
        catalog.define("Base").field(FieldSpec::generic("a")).build(&catalog).unwrap();
        catalog
            .define("Left")
            .parent("Base")
            .field(FieldSpec::generic("b"))
            .build(&catalog)
            .unwrap();
        catalog
            .define("Right")
            .parent("Base")
            .field(FieldSpec::generic("c"))
            .build(&catalog)
            .unwrap();
        let bottom = catalog
            .define("Bottom")
            .parent("Left")
            .parent("Right")
            .field(FieldSpec::generic("d"))
            .build(&catalog)
            .unwrap();

        assert_eq!(bottom.ancestor_names(), vec!["Left", "Right", "Base"]);
        assert_eq!(names(&bottom), vec!["a", "c", "b", "d"]);
        assert!(bottom.is_a("Base"));
        assert!(!bottom.is_a("Other"));
    }

    #[test]
    fn test_generated_operations() {
        let catalog = Catalog::new();
        let class = catalog
            .define("Order")
            .field(FieldSpec::timestamp("created").created())
            .field(FieldSpec::foreign_key("account", "Account"))
            .field(FieldSpec::alias("opened", "created"))
            .build(&catalog)
            .unwrap();
        for name in [
            "created",
            "created_invalid",
            "touch_created",
            "created_readable",
            "created_obj",
            "account_id",
            "account",
            "required_account",
            "opened",
        ] {
            assert!(class.has_method(name), "missing {name}");
        }
        assert_eq!(class.hook_chain(HookEvent::PostNew).len(), 1);
    }

    #[test]
    fn test_unknown_binding_rejected() {
        let catalog = Catalog::new();
        let err = catalog
            .define("Order")
            .field(FieldSpec::string("name").hook(HookEvent::PreInsert, "tidy_name"))
            .build(&catalog)
            .unwrap_err();
        assert!(err.is_config());
        assert!(catalog.get("Order").is_none());
    }

    #[test]
    fn test_alias_cycle_rejected() {
        let catalog = Catalog::new();
        let err = catalog
            .define("Loop")
            .field(FieldSpec::alias("a", "b"))
            .field(FieldSpec::alias("b", "a"))
            .build(&catalog)
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_field_columns_skip_storeless_kinds() {
        let catalog = Catalog::new();
        catalog.define("Disc").build(&catalog).unwrap();
        let artist = catalog
            .define("Artist")
            .field(FieldSpec::string("name").length(40).required(true))
            .field(FieldSpec::line_items("discs", "Disc", "artist"))
            .field(FieldSpec::alias("title", "name"))
            .field(FieldSpec::foreign_key("label", "Label"))
            .build(&catalog)
            .unwrap();
        let columns = artist.field_columns("artist");
        assert_eq!(columns.names(), vec!["id", "name", "label_id"]);
        let name = columns.get("name").unwrap();
        assert!(name.required);
        assert_eq!(name.length, Some(40));
    }

    #[test]
    fn test_table_inherited_from_ancestor() {
        use dbo_core::MemorySource;

        let catalog = Catalog::new();
        let base = catalog.define("Base").build(&catalog).unwrap();
        let child = catalog.define("Child").parent("Base").build(&catalog).unwrap();
        assert!(child.table().unwrap_err().is_config());

        base.bind_table(Arc::new(Table::new("base", Arc::new(MemorySource::new()))));
        assert_eq!(child.table().unwrap().name(), "base");
    }
}
