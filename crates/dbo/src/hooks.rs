//! Lifecycle hooks.
//!
//! Every record class owns an ordered list of callbacks per [`HookEvent`].
//! The chain that actually runs for a class is its ancestry's lists
//! concatenated, most distant ancestor first; a subclass never replaces an
//! ancestor's hooks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dbo_core::Result;

use crate::record::Record;

/// A lifecycle transition at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookEvent {
    /// After a transient record is constructed.
    PostNew,
    /// After a record is rehydrated from a fetched row.
    PostFetch,
    /// Before the insert is sent to the table.
    PreInsert,
    /// After the insert, with the primary key assigned.
    PostInsert,
    /// Before the update is sent to the table.
    PreUpdate,
    /// After the update.
    PostUpdate,
    /// Before the delete. Returning `false` vetoes it.
    PreDelete,
    /// After the row is gone.
    PostDelete,
}

impl HookEvent {
    /// Every event, in lifecycle order.
    pub const ALL: [HookEvent; 8] = [
        HookEvent::PostNew,
        HookEvent::PostFetch,
        HookEvent::PreInsert,
        HookEvent::PostInsert,
        HookEvent::PreUpdate,
        HookEvent::PostUpdate,
        HookEvent::PreDelete,
        HookEvent::PostDelete,
    ];

    /// Snake-case name, as used in declarative bindings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            HookEvent::PostNew => "post_new",
            HookEvent::PostFetch => "post_fetch",
            HookEvent::PreInsert => "pre_insert",
            HookEvent::PostInsert => "post_insert",
            HookEvent::PreUpdate => "pre_update",
            HookEvent::PostUpdate => "post_update",
            HookEvent::PreDelete => "pre_delete",
            HookEvent::PostDelete => "post_delete",
        }
    }

    /// Parse a snake-case name.
    #[must_use]
    pub fn from_str(name: &str) -> Option<Self> {
        HookEvent::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook callback. The return value only matters for [`HookEvent::PreDelete`],
/// where `false` vetoes the delete.
pub type HookFn = Arc<dyn Fn(&mut Record) -> Result<bool> + Send + Sync>;

/// A labelled callback.
#[derive(Clone)]
pub struct Hook {
    label: String,
    callback: HookFn,
}

impl Hook {
    /// Wrap a closure.
    pub fn new<F>(label: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&mut Record) -> Result<bool> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }

    /// Label shown in logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Invoke the callback.
    pub fn call(&self, record: &mut Record) -> Result<bool> {
        (self.callback)(record)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").field("label", &self.label).finish()
    }
}

/// Ordered hooks per event.
#[derive(Debug, Clone, Default)]
pub struct HookSet {
    hooks: BTreeMap<HookEvent, Vec<Hook>>,
}

impl HookSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook to an event's list.
    pub fn add(&mut self, event: HookEvent, hook: Hook) {
        self.hooks.entry(event).or_default().push(hook);
    }

    /// Append every hook of `other`, event by event.
    pub fn extend(&mut self, other: &HookSet) {
        for (event, hooks) in &other.hooks {
            self.hooks
                .entry(*event)
                .or_default()
                .extend(hooks.iter().cloned());
        }
    }

    /// Hooks registered for `event`, in order.
    pub fn get(&self, event: HookEvent) -> &[Hook] {
        self.hooks.get(&event).map_or(&[], Vec::as_slice)
    }

    /// Total number of hooks across events.
    pub fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    /// True when no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run `chain` against `record`.
///
/// Returns `false` only when a [`HookEvent::PreDelete`] hook vetoed; the rest
/// of the chain is skipped in that case.
pub(crate) fn run_chain(chain: &[Hook], event: HookEvent, record: &mut Record) -> Result<bool> {
    for hook in chain {
        tracing::debug!(
            class = record.class_name(),
            event = %event,
            hook = hook.label(),
            "running hook"
        );
        let proceed = hook.call(record)?;
        if !proceed && event == HookEvent::PreDelete {
            tracing::debug!(hook = hook.label(), "delete vetoed");
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        for event in HookEvent::ALL {
            assert_eq!(HookEvent::from_str(event.as_str()), Some(event));
        }
        assert_eq!(HookEvent::from_str("pre_save"), None);
    }

    #[test]
    fn test_hook_set_order() {
        let mut set = HookSet::new();
        set.add(HookEvent::PreInsert, Hook::new("a", |_| Ok(true)));
        set.add(HookEvent::PreInsert, Hook::new("b", |_| Ok(true)));
        set.add(HookEvent::PostDelete, Hook::new("c", |_| Ok(true)));

        let mut other = HookSet::new();
        other.add(HookEvent::PreInsert, Hook::new("d", |_| Ok(true)));
        set.extend(&other);

        let labels: Vec<&str> = set
            .get(HookEvent::PreInsert)
            .iter()
            .map(Hook::label)
            .collect();
        assert_eq!(labels, vec!["a", "b", "d"]);
        assert_eq!(set.len(), 4);
        assert!(set.get(HookEvent::PostNew).is_empty());
    }
}
