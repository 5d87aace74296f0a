//! Per-class field registry and inheritance merging.

use std::sync::Arc;

use dbo_core::{Error, Result};

use super::FieldSpec;

/// The fields declared directly on one record class, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    class_fields: Vec<Arc<FieldSpec>>,
}

impl FieldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spec. Names must be unique within the class.
    pub fn register(&mut self, spec: FieldSpec) -> Result<()> {
        if self.get(spec.name()).is_some() {
            return Err(Error::config(format!(
                "field `{}` declared twice on the same class",
                spec.name()
            )));
        }
        self.class_fields.push(Arc::new(spec));
        Ok(())
    }

    /// Specs declared on this class.
    pub fn class_fields(&self) -> &[Arc<FieldSpec>] {
        &self.class_fields
    }

    /// Spec declared on this class under `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<FieldSpec>> {
        self.class_fields.iter().find(|s| s.name() == name)
    }

    /// Number of specs declared on this class.
    pub fn len(&self) -> usize {
        self.class_fields.len()
    }

    /// True when the class declares no fields.
    pub fn is_empty(&self) -> bool {
        self.class_fields.is_empty()
    }

    /// Merge registries along an ancestry.
    ///
    /// `levels` is the breadth-first ancestry starting with the class itself.
    /// Names are ordered by first occurrence scanning from the most distant
    /// ancestor towards the class; each name's spec comes from the most
    /// derived level declaring it.
    pub fn merge<'a, I>(levels: I) -> Vec<Arc<FieldSpec>>
    where
        I: IntoIterator<Item = &'a FieldRegistry>,
    {
        let levels: Vec<&FieldRegistry> = levels.into_iter().collect();

        let mut order: Vec<&str> = Vec::new();
        for registry in levels.iter().rev() {
            for spec in &registry.class_fields {
                if !order.contains(&spec.name()) {
                    order.push(spec.name());
                }
            }
        }

        order
            .into_iter()
            .filter_map(|name| levels.iter().find_map(|r| r.get(name)).cloned())
            .collect()
    }
}
