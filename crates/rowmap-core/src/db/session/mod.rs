//! Session: one identity map + one change tracker + one unit of work over
//! a shared registry and store adapter.
//!
//! Sessions are single-threaded and synchronous; any I/O wait happens
//! inside the adapter call. Nothing a session owns crosses to another
//! session.

mod hydrate;


use crate::{
    db::{
        identity::IdentityMap,
        instance::{InstanceHandle, InstanceId, RelationState},
        query::{Predicate, QueryError, translate, translate_key},
        store::{Operation, Page, SelectOperation, StoreAdapter, StoreResponse, StoreRow},
        tracker::{ChangeKind, ChangeTracker},
        unit::{
            FlushCursor, FlushError, FlushReport, OpKind, OpSummary, PendingOp, SessionState,
            build_plan,
        },
    },
    error::CoreError,
    model::{Cardinality, Registry},
    obs::{MetricsEvent, MetricsSink, NoopSink},
    value::{ScalarType, Value},
};
use std::{collections::BTreeMap, rc::Rc, sync::Arc, time::Instant};
use thiserror::Error as ThisError;
use ulid::Ulid;

pub use hydrate::HydrateError;
pub(crate) use hydrate::hydrate_row;

///
/// SessionError
/// Caller misuse of the session surface and flush-time value violations.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SessionError {
    #[error("'{operation}' is invalid in state {state}")]
    InvalidState {
        state: SessionState,
        operation: &'static str,
    },

    #[error("instance {id} does not belong to this session")]
    ForeignInstance { id: InstanceId },

    #[error("unknown attribute '{attribute}' on '{type_name}'")]
    UnknownAttribute { type_name: String, attribute: String },

    #[error("attribute '{attribute}' on '{type_name}' rejects value {value} (expected {ty})")]
    AttributeValue {
        type_name: String,
        attribute: String,
        ty: ScalarType,
        value: Value,
    },

    #[error("primary key of '{type_name}'[{key}] cannot change once persisted")]
    KeyMutation { type_name: String, key: Value },

    #[error("instance {id} of '{type_name}' has no primary key")]
    MissingKey { type_name: String, id: InstanceId },

    #[error("unknown relationship '{relationship}' on '{type_name}'")]
    UnknownRelationship {
        type_name: String,
        relationship: String,
    },

    #[error("session invariant violated: {message}")]
    Internal { message: String },
}

impl SessionError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

///
/// Session
///
/// Public engine surface for one unit of work: load, track, mutate, flush.
///

pub struct Session {
    registry: Arc<Registry>,
    adapter: Arc<dyn StoreAdapter>,
    identity: IdentityMap,
    tracker: ChangeTracker,
    state: SessionState,
    debug: bool,
    sink: Arc<dyn MetricsSink>,
}

impl Session {
    // ------------------------------------------------------------------
    // Construction & configuration
    // ------------------------------------------------------------------

    #[must_use]
    pub fn new(registry: Arc<Registry>, adapter: Arc<dyn StoreAdapter>) -> Self {
        Self {
            registry,
            adapter,
            identity: IdentityMap::new(),
            tracker: ChangeTracker::new(),
            state: SessionState::Open,
            debug: false,
            sink: Arc::new(NoopSink),
        }
    }

    /// Enable debug traces for operations executed in this session.
    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Override the metrics sink for this session.
    #[must_use]
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// True when any tracked instance would produce an operation.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.identity.ids().into_iter().any(|id| {
            self.identity
                .handle(id)
                .is_some_and(|handle| self.tracker.classify(&handle.borrow()) != ChangeKind::Unchanged)
        })
    }

    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.identity.len()
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Fetch one instance by primary key.
    ///
    /// The identity map answers without store access when the instance is
    /// already loaded; the in-session object is authoritative.
    pub fn get(&mut self, type_name: &str, key: &Value) -> Result<Option<InstanceHandle>, CoreError> {
        self.ensure_open("get")?;

        if let Some(handle) = self.identity.get(type_name, key) {
            return Ok(Some(handle));
        }

        let registry = Arc::clone(&self.registry);
        let model = registry.resolve(type_name)?;
        let select = translate_key(model, key)?;
        let rows = self.execute_select(type_name, select)?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };

        Ok(Some(self.admit_row(type_name, row)?))
    }

    /// Fetch instances matching an attribute predicate.
    pub fn query(
        &mut self,
        type_name: &str,
        predicate: &Predicate,
        page: Page,
    ) -> Result<Vec<InstanceHandle>, CoreError> {
        self.ensure_open("query")?;

        let registry = Arc::clone(&self.registry);
        let model = registry.resolve(type_name)?;
        let select = translate(model, predicate, page)?;
        let rows = self.execute_select(type_name, select)?;

        let mut handles = Vec::with_capacity(rows.len());
        for row in &rows {
            handles.push(self.admit_row(type_name, row)?);
        }

        Ok(handles)
    }

    /// Resolve a relationship on first access; later calls reuse the
    /// recorded keys without store access.
    pub fn load_relation(
        &mut self,
        handle: &InstanceHandle,
        name: &str,
    ) -> Result<Vec<InstanceHandle>, CoreError> {
        self.ensure_open("load_relation")?;

        let (id, type_name) = {
            let instance = handle.borrow();
            (instance.id(), instance.type_name().to_string())
        };
        self.ensure_owned(id, handle)?;

        let registry = Arc::clone(&self.registry);
        let model = registry.resolve(&type_name)?;
        let Some(rel) = model.relationship_named(name) else {
            return Err(SessionError::UnknownRelationship {
                type_name,
                relationship: name.to_string(),
            }
            .into());
        };

        let cached = match handle.borrow().relation_state(name) {
            RelationState::Loaded(keys) => Some(keys.clone()),
            RelationState::NotLoaded => None,
        };
        if let Some(keys) = cached {
            let mut out = Vec::with_capacity(keys.len());
            for key in &keys {
                if let Some(target) = self.get(&rel.target, key)? {
                    out.push(target);
                }
            }
            return Ok(out);
        }

        let handles = match rel.cardinality {
            Cardinality::One => {
                let fk = handle.borrow().get(&rel.fk_attribute);
                if fk.is_null() {
                    Vec::new()
                } else {
                    self.get(&rel.target, &fk)?.into_iter().collect()
                }
            }
            Cardinality::Many => match handle.borrow().key().cloned() {
                // An unpersisted parent has nothing referencing it yet.
                None => Vec::new(),
                Some(key) => {
                    let predicate = Predicate::eq(rel.fk_attribute.clone(), key);
                    self.query(&rel.target, &predicate, Page::default())?
                }
            },
        };

        let keys = handles
            .iter()
            .filter_map(|target| target.borrow().key().cloned())
            .collect();
        handle
            .borrow_mut()
            .set_relation_state(name, RelationState::Loaded(keys));

        Ok(handles)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Admit a newly created instance with the given attribute values.
    ///
    /// A non-null value under the key attribute counts as a caller-assigned
    /// primary key; otherwise the store assigns one at flush.
    pub fn add(
        &mut self,
        type_name: &str,
        mut values: BTreeMap<String, Value>,
    ) -> Result<InstanceHandle, CoreError> {
        self.ensure_open("add")?;

        let registry = Arc::clone(&self.registry);
        let model = registry.resolve(type_name)?;

        for (name, value) in &values {
            let Some(attr) = model.attribute_named(name) else {
                return Err(SessionError::UnknownAttribute {
                    type_name: model.type_name.clone(),
                    attribute: name.clone(),
                }
                .into());
            };
            // Nullability is enforced at flush so attributes can be filled
            // in after add; the type itself is checked now.
            if !value.is_null() && value.scalar_type() != Some(attr.ty) {
                return Err(SessionError::AttributeValue {
                    type_name: model.type_name.clone(),
                    attribute: name.clone(),
                    ty: attr.ty,
                    value: value.clone(),
                }
                .into());
            }
        }

        // Seed the version counter for versioned types.
        if let Some(version_attr) = &model.version_attribute
            && values
                .get(version_attr)
                .is_none_or(Value::is_null)
        {
            values.insert(version_attr.clone(), Value::Uint(1));
        }

        let key = model
            .primary_key()
            .and_then(|pk| values.get(&pk.name))
            .filter(|value| !value.is_null())
            .cloned();

        let handle = self.identity.register_pending(type_name, key, values)?;
        self.tracker.mark_new(handle.borrow().id());
        self.debug_log(format!("add {type_name} {}", handle.borrow().id()));

        Ok(handle)
    }

    /// Mark an instance for deletion at the next flush. Deleting a
    /// never-flushed instance cancels its insert.
    pub fn delete(&mut self, handle: &InstanceHandle) -> Result<(), CoreError> {
        self.ensure_open("delete")?;

        let id = handle.borrow().id();
        self.ensure_owned(id, handle)?;
        self.tracker.mark_deleted(id);

        Ok(())
    }

    // ------------------------------------------------------------------
    // Unit-of-work lifecycle
    // ------------------------------------------------------------------

    /// Translate tracked changes into ordered store operations and execute
    /// them one at a time.
    ///
    /// On the first failure the remaining operations are abandoned and a
    /// [`FlushError`] carries the success cursor; the session returns to
    /// open either way.
    pub fn flush(&mut self) -> Result<FlushReport, CoreError> {
        self.ensure_open("flush")?;
        self.state = SessionState::Flushing;
        let result = self.flush_inner();
        self.state = SessionState::Open;
        result
    }

    /// Flush if dirty, then finalize the session.
    pub fn commit(&mut self) -> Result<FlushReport, CoreError> {
        self.ensure_open("commit")?;

        let report = if self.is_dirty() {
            self.flush()?
        } else {
            FlushReport::default()
        };

        self.state = SessionState::Committed;
        self.identity.clear();
        self.tracker.clear();

        Ok(report)
    }

    /// Discard all tracked changes and evict every instance. The session
    /// stays open and usable.
    pub fn rollback(&mut self) -> Result<(), CoreError> {
        self.ensure_open("rollback")?;

        self.tracker.clear();
        self.identity.clear();

        Ok(())
    }

    /// Terminate the session, dropping all tracked state. Idempotent.
    pub fn close(&mut self) {
        self.tracker.clear();
        self.identity.clear();
        self.state = SessionState::Closed;
    }

    // ------------------------------------------------------------------
    // Flush internals
    // ------------------------------------------------------------------

    fn flush_inner(&mut self) -> Result<FlushReport, CoreError> {
        let flush_id = Ulid::new();
        let started = Instant::now();

        let plan = build_plan(&self.registry, &self.identity, &self.tracker)?;
        for id in &plan.dropped {
            self.identity.evict(*id);
            self.tracker.forget(*id);
        }

        let total = plan.ops.len();
        let mut completed: Vec<OpSummary> = Vec::new();
        let mut report = FlushReport::default();

        for (index, op) in plan.ops.into_iter().enumerate() {
            self.debug_log(format!(
                "flush {flush_id}: {} ({}/{total})",
                op.summary(),
                index + 1
            ));

            match self.adapter.execute(op.operation.clone()) {
                Ok(response) => {
                    let summary = self.apply_success(&op, response)?;
                    match op.kind {
                        OpKind::Insert => report.inserts += 1,
                        OpKind::Update => report.updates += 1,
                        OpKind::Delete => report.deletes += 1,
                    }
                    completed.push(summary);
                }
                Err(err) => {
                    self.debug_log(format!("flush {flush_id}: aborted ({err})"));
                    return Err(FlushError {
                        cursor: FlushCursor {
                            completed,
                            remaining: total - index - 1,
                        },
                        cause: err.into(),
                    }
                    .into());
                }
            }
        }

        self.sink.record(&MetricsEvent::Flush {
            flush_id,
            inserts: report.inserts,
            updates: report.updates,
            deletes: report.deletes,
            elapsed_micros: started.elapsed().as_micros(),
        });

        Ok(report)
    }

    fn apply_success(
        &mut self,
        op: &PendingOp,
        response: StoreResponse,
    ) -> Result<OpSummary, CoreError> {
        match op.kind {
            OpKind::Insert => self.apply_insert(op, response),
            OpKind::Update => self.apply_update(op),
            OpKind::Delete => {
                self.identity.evict(op.id);
                self.tracker.forget(op.id);
                Ok(op.summary())
            }
        }
    }

    fn apply_insert(
        &mut self,
        op: &PendingOp,
        response: StoreResponse,
    ) -> Result<OpSummary, CoreError> {
        let StoreResponse::InsertedKey(key) = response else {
            return Err(SessionError::internal(format!(
                "insert of '{}' answered without a key",
                op.type_name
            ))
            .into());
        };

        let registry = Arc::clone(&self.registry);
        let model = registry.resolve(&op.type_name)?;
        let pk_name = model
            .primary_key()
            .map(|pk| pk.name.clone())
            .ok_or_else(|| {
                SessionError::internal(format!("type '{}' lost its primary key", op.type_name))
            })?;

        let handle = self
            .identity
            .handle(op.id)
            .ok_or_else(|| SessionError::internal(format!("instance {} vanished mid-flush", op.id)))?;

        if handle.borrow().key().is_none() {
            self.identity.promote(op.id, key.clone())?;
        }
        handle.borrow_mut().set_value(&pk_name, key.clone());
        self.tracker.snapshot(&handle.borrow());

        Ok(OpSummary {
            kind: OpKind::Insert,
            type_name: op.type_name.clone(),
            key: Some(key),
        })
    }

    fn apply_update(&mut self, op: &PendingOp) -> Result<OpSummary, CoreError> {
        let handle = self
            .identity
            .handle(op.id)
            .ok_or_else(|| SessionError::internal(format!("instance {} vanished mid-flush", op.id)))?;

        if let Some((attribute, version)) = &op.new_version {
            handle
                .borrow_mut()
                .set_value(attribute, Value::Uint(*version));
        }
        self.tracker.snapshot(&handle.borrow());

        Ok(op.summary())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn admit_row(&mut self, type_name: &str, row: &StoreRow) -> Result<InstanceHandle, CoreError> {
        let registry = Arc::clone(&self.registry);
        let model = registry.resolve(type_name)?;
        let (key, values) = hydrate_row(model, row)?;

        let mut fresh = false;
        let handle = self.identity.get_or_create(type_name, &key, || {
            fresh = true;
            Ok::<_, CoreError>(values)
        })?;
        // First load wins: an instance already in the session keeps its
        // state, and only a fresh admission takes a snapshot.
        if fresh {
            self.tracker.snapshot(&handle.borrow());
        }

        Ok(handle)
    }

    fn execute_select(
        &mut self,
        type_name: &str,
        select: SelectOperation,
    ) -> Result<Vec<StoreRow>, CoreError> {
        let started = Instant::now();
        let response = self
            .adapter
            .execute(Operation::Select(select))
            .map_err(QueryError::from)?;

        let StoreResponse::Rows(rows) = response else {
            return Err(SessionError::internal("select answered without rows").into());
        };

        self.sink.record(&MetricsEvent::Query {
            type_name: type_name.to_string(),
            rows: rows.len(),
            elapsed_micros: started.elapsed().as_micros(),
        });
        self.debug_log(format!("select {type_name}: {} rows", rows.len()));

        Ok(rows)
    }

    fn ensure_open(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.state == SessionState::Open {
            return Ok(());
        }

        Err(SessionError::InvalidState {
            state: self.state,
            operation,
        })
    }

    fn ensure_owned(&self, id: InstanceId, handle: &InstanceHandle) -> Result<(), SessionError> {
        let owned = self
            .identity
            .handle(id)
            .is_some_and(|tracked| Rc::ptr_eq(&tracked, handle));
        if owned {
            return Ok(());
        }

        Err(SessionError::ForeignInstance { id })
    }

    fn debug_log(&self, message: impl AsRef<str>) {
        if self.debug {
            log::debug!("{}", message.as_ref());
        }
    }
}
