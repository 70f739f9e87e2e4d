//! Module: change tracker
//! Responsibility: snapshots, field-by-field diffing, and lifecycle marks.
//! Does not own: instances, operation ordering, or store access.
//!
//! Invariants:
//! - Snapshots are immutable once taken; only a successful flush or a new
//!   load replaces one.
//! - Classification never produces an operation for a clean, unmarked
//!   instance; flush cost tracks mutations, not session size.

#[cfg(test)]
mod tests;

use crate::{
    db::instance::{Instance, InstanceId},
    value::Value,
};
use std::collections::{BTreeMap, BTreeSet};

///
/// Snapshot
///
/// Immutable copy of an instance's attribute values, taken at load time or
/// after a successful flush. Used only for diffing.
///

#[derive(Clone, Debug)]
pub struct Snapshot {
    values: BTreeMap<String, Value>,
}

impl Snapshot {
    fn capture(instance: &Instance) -> Self {
        Self {
            values: instance.values().clone(),
        }
    }

    #[must_use]
    pub fn get(&self, attribute: &str) -> Value {
        self.values.get(attribute).cloned().unwrap_or(Value::Null)
    }
}

///
/// ChangeKind
/// Flush-set classification for one tracked instance.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChangeKind {
    /// Marked new; insert on flush.
    Insert,
    /// Snapshot exists and differs; the changed attribute/value pairs.
    Update { changed: Vec<(String, Value)> },
    /// Persisted and marked deleted; delete on flush.
    Delete,
    /// Marked new, then deleted before ever flushing; drop silently.
    Dropped,
    /// Clean; produces no operation.
    Unchanged,
}

///
/// ChangeTracker
///

#[derive(Debug, Default)]
pub struct ChangeTracker {
    snapshots: BTreeMap<InstanceId, Snapshot>,
    new: BTreeSet<InstanceId>,
    deleted: BTreeSet<InstanceId>,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current attribute values as the clean baseline.
    ///
    /// Called once after load and again after each successful flush of the
    /// instance; a snapshot also clears the new-mark, since the instance is
    /// now persisted.
    pub fn snapshot(&mut self, instance: &Instance) {
        let id = instance.id();
        self.snapshots.insert(id, Snapshot::capture(instance));
        self.new.remove(&id);
    }

    #[must_use]
    pub fn snapshot_of(&self, id: InstanceId) -> Option<&Snapshot> {
        self.snapshots.get(&id)
    }

    /// Changed attributes relative to the snapshot, by value equality.
    /// Empty when clean or when no snapshot exists.
    #[must_use]
    pub fn diff(&self, instance: &Instance) -> Vec<(String, Value)> {
        let Some(snapshot) = self.snapshots.get(&instance.id()) else {
            return Vec::new();
        };

        let mut changed = Vec::new();
        // Union of both key sets: attributes may appear on either side.
        let names: BTreeSet<&String> = snapshot
            .values
            .keys()
            .chain(instance.values().keys())
            .collect();
        for name in names {
            let before = snapshot.get(name);
            let after = instance.get(name);
            if before != after {
                changed.push((name.clone(), after));
            }
        }

        changed
    }

    /// Register an explicit created-in-session transition.
    pub fn mark_new(&mut self, id: InstanceId) {
        self.new.insert(id);
    }

    /// Register an explicit deleted transition. Deleting an instance that
    /// was never flushed cancels its pending insert.
    pub fn mark_deleted(&mut self, id: InstanceId) {
        self.deleted.insert(id);
    }

    #[must_use]
    pub fn is_marked_new(&self, id: InstanceId) -> bool {
        self.new.contains(&id)
    }

    #[must_use]
    pub fn is_marked_deleted(&self, id: InstanceId) -> bool {
        self.deleted.contains(&id)
    }

    /// Classify one instance for the flush set.
    #[must_use]
    pub fn classify(&self, instance: &Instance) -> ChangeKind {
        let id = instance.id();

        if self.deleted.contains(&id) {
            if self.new.contains(&id) {
                return ChangeKind::Dropped;
            }
            if self.snapshots.contains_key(&id) || instance.is_persisted() {
                return ChangeKind::Delete;
            }
            return ChangeKind::Dropped;
        }

        if self.new.contains(&id) {
            return ChangeKind::Insert;
        }

        let changed = self.diff(instance);
        if changed.is_empty() {
            ChangeKind::Unchanged
        } else {
            ChangeKind::Update { changed }
        }
    }

    /// Drop all tracking state for one instance (eviction path).
    pub fn forget(&mut self, id: InstanceId) {
        self.snapshots.remove(&id);
        self.new.remove(&id);
        self.deleted.remove(&id);
    }

    /// Reset the tracker (rollback path).
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.new.clear();
        self.deleted.clear();
    }
}
