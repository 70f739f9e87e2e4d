use crate::value::Value;
use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

///
/// InstanceId
///
/// Session-unique identity assigned at admission into the identity map.
/// Stable across key promotion, so trackers and flush plans key on it.
/// Ordering follows admission order.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct InstanceId(pub(crate) u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

///
/// Instance
///
/// A materialized object of a mapped type: current attribute values plus
/// the primary-key value once persisted. Instances are constructed only by
/// the identity map, which remains their single strong owner; callers hold
/// [`InstanceHandle`]s valid within one session.
///

#[derive(Debug)]
pub struct Instance {
    id: InstanceId,
    type_name: String,
    key: Option<Value>,
    values: BTreeMap<String, Value>,
    relations: BTreeMap<String, RelationState>,
}

pub type InstanceHandle = Rc<RefCell<Instance>>;

impl Instance {
    pub(crate) fn new(
        id: InstanceId,
        type_name: impl Into<String>,
        key: Option<Value>,
        values: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            key,
            values,
            relations: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Primary-key value; `None` until the instance is persisted or the
    /// caller assigned a key at creation.
    #[must_use]
    pub const fn key(&self) -> Option<&Value> {
        self.key.as_ref()
    }

    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.key.is_some()
    }

    pub(crate) fn set_key(&mut self, key: Value) {
        self.key = Some(key);
    }

    /// Current value of one attribute; absent attributes read as null.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Value {
        self.values.get(attribute).cloned().unwrap_or(Value::Null)
    }

    /// Set one attribute value. Validation happens at flush time against
    /// the mapping metadata, not here.
    pub fn set(&mut self, attribute: impl Into<String>, value: Value) {
        self.values.insert(attribute.into(), value);
    }

    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub(crate) fn set_value(&mut self, attribute: &str, value: Value) {
        self.values.insert(attribute.to_string(), value);
    }

    #[must_use]
    pub fn relation_state(&self, name: &str) -> &RelationState {
        self.relations.get(name).unwrap_or(&RelationState::NotLoaded)
    }

    pub(crate) fn set_relation_state(&mut self, name: impl Into<String>, state: RelationState) {
        self.relations.insert(name.into(), state);
    }
}

///
/// RelationState
///
/// Per-relationship load state. Loaded state records target primary keys
/// rather than handles; resolution goes back through the identity map, so
/// no ownership cycles form between related instances.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelationState {
    NotLoaded,
    Loaded(Vec<Value>),
}

impl RelationState {
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}
