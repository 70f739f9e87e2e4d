//! Module: identity map
//! Responsibility: one in-memory instance per persisted row, per session.
//! Does not own: change tracking, flush planning, or store access.
//!
//! Invariants:
//! - At most one instance per (type, primary key) for the session lifetime.
//! - Every admitted instance carries a session-unique `InstanceId` that is
//!   stable across key promotion.
//! - A lookup never observes an instance under both its pending and keyed
//!   identity.


use crate::{
    db::instance::{Instance, InstanceHandle, InstanceId},
    value::Value,
};
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};
use thiserror::Error as ThisError;

///
/// IdentityError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum IdentityError {
    #[error("an instance of '{type_name}' with key {key} is already tracked")]
    KeyOccupied { type_name: String, key: Value },

    #[error("instance {id} is not tracked by this session")]
    UnknownInstance { id: InstanceId },

    #[error("instance {id} already carries key {key}")]
    AlreadyKeyed { id: InstanceId, key: Value },
}

///
/// IdentityMap
///
/// Per-session cache keyed by (type name, primary key). Instances are
/// constructed only here, so the map is their single strong owner.
///

#[derive(Default)]
pub struct IdentityMap {
    by_id: BTreeMap<InstanceId, InstanceHandle>,
    keyed: BTreeMap<(String, Value), InstanceId>,
    next_id: u64,
}

impl IdentityMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the instance for (type, key), if present.
    #[must_use]
    pub fn get(&self, type_name: &str, key: &Value) -> Option<InstanceHandle> {
        let id = self
            .keyed
            .get(&(type_name.to_string(), key.clone()))?;
        self.by_id.get(id).cloned()
    }

    /// Return the existing instance for (type, key) or hydrate and admit a
    /// new one. Guarantees at most one instance per key.
    pub fn get_or_create<E>(
        &mut self,
        type_name: &str,
        key: &Value,
        hydrate: impl FnOnce() -> Result<BTreeMap<String, Value>, E>,
    ) -> Result<InstanceHandle, E> {
        if let Some(handle) = self.get(type_name, key) {
            return Ok(handle);
        }

        let values = hydrate()?;
        let id = self.allocate_id();
        let handle = Rc::new(RefCell::new(Instance::new(
            id,
            type_name,
            Some(key.clone()),
            values,
        )));
        self.by_id.insert(id, handle.clone());
        self.keyed.insert((type_name.to_string(), key.clone()), id);

        Ok(handle)
    }

    /// Admit a newly created, not-yet-persisted instance. A caller-assigned
    /// key registers the keyed identity immediately; otherwise the instance
    /// stays pending until [`IdentityMap::promote`].
    pub fn register_pending(
        &mut self,
        type_name: &str,
        key: Option<Value>,
        values: BTreeMap<String, Value>,
    ) -> Result<InstanceHandle, IdentityError> {
        if let Some(key) = &key
            && self.keyed.contains_key(&(type_name.to_string(), key.clone()))
        {
            return Err(IdentityError::KeyOccupied {
                type_name: type_name.to_string(),
                key: key.clone(),
            });
        }

        let id = self.allocate_id();
        let handle = Rc::new(RefCell::new(Instance::new(
            id,
            type_name,
            key.clone(),
            values,
        )));
        self.by_id.insert(id, handle.clone());
        if let Some(key) = key {
            self.keyed.insert((type_name.to_string(), key), id);
        }

        Ok(handle)
    }

    /// Re-key a pending instance once the store assigned its primary key.
    ///
    /// Atomic with respect to lookups in the same session: the keyed entry
    /// and the instance key are written back-to-back with no intervening
    /// caller-visible step.
    pub fn promote(&mut self, id: InstanceId, key: Value) -> Result<(), IdentityError> {
        let Some(handle) = self.by_id.get(&id) else {
            return Err(IdentityError::UnknownInstance { id });
        };

        let type_name = {
            let instance = handle.borrow();
            if let Some(existing) = instance.key() {
                return Err(IdentityError::AlreadyKeyed {
                    id,
                    key: existing.clone(),
                });
            }
            instance.type_name().to_string()
        };

        if self.keyed.contains_key(&(type_name.clone(), key.clone())) {
            return Err(IdentityError::KeyOccupied {
                type_name,
                key,
            });
        }

        handle.borrow_mut().set_key(key.clone());
        self.keyed.insert((type_name, key), id);

        Ok(())
    }

    /// Remove an instance (delete or rollback path).
    pub fn evict(&mut self, id: InstanceId) {
        if let Some(handle) = self.by_id.remove(&id) {
            let instance = handle.borrow();
            if let Some(key) = instance.key() {
                self.keyed
                    .remove(&(instance.type_name().to_string(), key.clone()));
            }
        }
    }

    #[must_use]
    pub fn handle(&self, id: InstanceId) -> Option<InstanceHandle> {
        self.by_id.get(&id).cloned()
    }

    /// All tracked ids in admission order.
    #[must_use]
    pub fn ids(&self) -> Vec<InstanceId> {
        self.by_id.keys().copied().collect()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.keyed.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    const fn allocate_id(&mut self) -> InstanceId {
        self.next_id += 1;
        InstanceId(self.next_id)
    }
}
