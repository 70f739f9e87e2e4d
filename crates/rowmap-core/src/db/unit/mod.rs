//! Module: unit of work
//! Responsibility: flush planning — classification into operations,
//! dependency ordering, and the partial-failure cursor contract.
//! Does not own: instances, snapshots, or store execution (the session
//! drives the plan through the adapter).
//!
//! Invariants:
//! - Inserts run in registry insert order (referenced types first),
//!   deletes in reverse, updates in between.
//! - A clean, unmarked instance contributes no operation.
//! - The first failure aborts the remaining sequence; the cursor reports
//!   exactly what completed.


use crate::{
    db::{
        identity::IdentityMap,
        instance::{Instance, InstanceId},
        session::SessionError,
        store::{AdapterError, Operation},
        tracker::{ChangeKind, ChangeTracker},
    },
    error::CoreError,
    model::{AttributeModel, Registry, TypeModel},
    value::{ScalarType, Value},
};
use derive_more::Display;
use serde::Serialize;
use std::fmt;
use thiserror::Error as ThisError;

///
/// SessionState
///
/// `Open → Flushing → Open` per flush; `Committed` and `Closed` terminal.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum SessionState {
    #[display("closed")]
    Closed,
    #[display("committed")]
    Committed,
    #[display("flushing")]
    Flushing,
    #[display("open")]
    Open,
}

///
/// OpKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum OpKind {
    #[display("insert")]
    Insert,
    #[display("update")]
    Update,
    #[display("delete")]
    Delete,
}

impl OpKind {
    const fn phase(self) -> u8 {
        match self {
            Self::Insert => 0,
            Self::Update => 1,
            Self::Delete => 2,
        }
    }
}

///
/// OpSummary
/// What the flush cursor records about one completed operation.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct OpSummary {
    pub kind: OpKind,
    pub type_name: String,
    pub key: Option<Value>,
}

impl fmt::Display for OpSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} {}[{key}]", self.kind, self.type_name),
            None => write!(f, "{} {}", self.kind, self.type_name),
        }
    }
}

///
/// FlushCursor
///
/// Partial-failure report: every operation that landed before the failure,
/// in execution order, plus the count that was never attempted.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FlushCursor {
    pub completed: Vec<OpSummary>,
    pub remaining: usize,
}

///
/// FlushCause
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum FlushCause {
    /// Version mismatch reported by the store; surfaced unmodified and
    /// never retried.
    #[error("concurrent modification detected: {relation}[{key}]")]
    Conflict { relation: String, key: Value },

    #[error(transparent)]
    Adapter(AdapterError),
}

impl From<AdapterError> for FlushCause {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Conflict { relation, key } => Self::Conflict { relation, key },
            other => Self::Adapter(other),
        }
    }
}

///
/// FlushError
///
/// Raised on the first failed operation. The session stays open but its
/// tracked state may no longer match the store; sanctioned recovery is
/// rollback or a caller-inspected re-flush.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error(
    "flush aborted: {} completed, 1 failed, {} never attempted ({cause})",
    .cursor.completed.len(),
    .cursor.remaining
)]
pub struct FlushError {
    pub cursor: FlushCursor,
    pub cause: FlushCause,
}

///
/// FlushReport
/// Per-kind operation counts of a successful flush.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FlushReport {
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl FlushReport {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }
}

///
/// PendingOp
/// One planned operation, bound to the instance it targets.
///

#[derive(Clone, Debug)]
pub(crate) struct PendingOp {
    pub id: InstanceId,
    pub kind: OpKind,
    pub type_name: String,
    pub operation: Operation,
    /// In-memory version value to apply after a successful update.
    pub new_version: Option<(String, u64)>,
}

impl PendingOp {
    pub fn summary(&self) -> OpSummary {
        let key = match &self.operation {
            Operation::Insert { key, .. } => key.clone(),
            Operation::Update { key, .. } | Operation::Delete { key, .. } => Some(key.clone()),
            Operation::Select(_) => None,
        };

        OpSummary {
            kind: self.kind,
            type_name: self.type_name.clone(),
            key,
        }
    }
}

///
/// FlushPlan
///

#[derive(Debug, Default)]
pub(crate) struct FlushPlan {
    pub ops: Vec<PendingOp>,
    /// Instances whose pending insert was cancelled; evicted before any
    /// operation executes.
    pub dropped: Vec<InstanceId>,
}

impl FlushPlan {
    pub const fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.dropped.is_empty()
    }
}

/// Build the ordered operation plan for the current session state.
pub(crate) fn build_plan(
    registry: &Registry,
    identity: &IdentityMap,
    tracker: &ChangeTracker,
) -> Result<FlushPlan, CoreError> {
    let mut plan = FlushPlan::default();

    for id in identity.ids() {
        let Some(handle) = identity.handle(id) else {
            continue;
        };
        let instance = handle.borrow();
        let model = registry.resolve(instance.type_name())?;

        match tracker.classify(&instance) {
            ChangeKind::Unchanged => {}
            ChangeKind::Dropped => plan.dropped.push(id),
            ChangeKind::Insert => plan.ops.push(insert_op(model, &instance)?),
            ChangeKind::Update { changed } => {
                plan.ops
                    .push(update_op(model, &instance, changed, tracker)?);
            }
            ChangeKind::Delete => plan.ops.push(delete_op(model, &instance)?),
        }
    }

    order_ops(registry, &mut plan.ops);

    Ok(plan)
}

// Inserts ascend the insert order, deletes descend it, updates sit in
// between. Within a phase and type, admission order keeps the plan
// deterministic.
fn order_ops(registry: &Registry, ops: &mut [PendingOp]) {
    ops.sort_by_key(|op| {
        let rank = registry.insert_rank(&op.type_name).unwrap_or(usize::MAX);
        let rank = match op.kind {
            OpKind::Insert | OpKind::Update => rank,
            OpKind::Delete => usize::MAX - rank,
        };
        (op.kind.phase(), rank, op.id)
    });
}

fn insert_op(model: &TypeModel, instance: &Instance) -> Result<PendingOp, CoreError> {
    let pk = primary_key(model)?;

    let mut values = Vec::with_capacity(model.attributes.len());
    for attr in &model.attributes {
        if attr.primary_key {
            continue;
        }
        let value = instance.get(&attr.name);
        check_value(model, &attr.name, attr.ty, attr.nullable, &value)?;
        values.push((attr.column.clone(), value));
    }

    let key = instance.key().cloned();
    if let Some(key) = &key {
        check_value(model, &pk.name, pk.ty, false, key)?;
    }

    Ok(PendingOp {
        id: instance.id(),
        kind: OpKind::Insert,
        type_name: model.type_name.clone(),
        operation: Operation::Insert {
            relation: model.relation.clone(),
            key_column: pk.column.clone(),
            key,
            values,
        },
        new_version: None,
    })
}

fn update_op(
    model: &TypeModel,
    instance: &Instance,
    changed: Vec<(String, Value)>,
    tracker: &ChangeTracker,
) -> Result<PendingOp, CoreError> {
    let pk = primary_key(model)?;
    let Some(key) = instance.key().cloned() else {
        return Err(SessionError::MissingKey {
            type_name: model.type_name.clone(),
            id: instance.id(),
        }
        .into());
    };

    let mut columns = Vec::with_capacity(changed.len());
    for (name, value) in changed {
        let Some(attr) = model.attribute_named(&name) else {
            return Err(SessionError::UnknownAttribute {
                type_name: model.type_name.clone(),
                attribute: name,
            }
            .into());
        };
        if attr.primary_key {
            return Err(SessionError::KeyMutation {
                type_name: model.type_name.clone(),
                key: key.clone(),
            }
            .into());
        }
        if Some(&attr.name) == model.version_attribute.as_ref() {
            // The engine owns the version counter; a manual bump is folded
            // into the one it computes below.
            continue;
        }
        check_value(model, &attr.name, attr.ty, attr.nullable, &value)?;
        columns.push((attr.column.clone(), value));
    }

    // Optimistic-concurrency hook: send the snapshot's version and write
    // the incremented one alongside the changed columns.
    let mut expected_version = None;
    let mut new_version = None;
    if let Some(version_attr) = &model.version_attribute
        && let Some(attr) = model.attribute_named(version_attr)
    {
        let current = tracker
            .snapshot_of(instance.id())
            .map(|snapshot| snapshot.get(version_attr))
            .and_then(|value| value.as_uint())
            .unwrap_or(0);
        expected_version = Some((attr.column.clone(), Value::Uint(current)));
        columns.push((attr.column.clone(), Value::Uint(current + 1)));
        new_version = Some((version_attr.clone(), current + 1));
    }

    Ok(PendingOp {
        id: instance.id(),
        kind: OpKind::Update,
        type_name: model.type_name.clone(),
        operation: Operation::Update {
            relation: model.relation.clone(),
            key_column: pk.column.clone(),
            key,
            changed: columns,
            expected_version,
        },
        new_version,
    })
}

fn delete_op(model: &TypeModel, instance: &Instance) -> Result<PendingOp, CoreError> {
    let pk = primary_key(model)?;
    let Some(key) = instance.key().cloned() else {
        return Err(SessionError::MissingKey {
            type_name: model.type_name.clone(),
            id: instance.id(),
        }
        .into());
    };

    Ok(PendingOp {
        id: instance.id(),
        kind: OpKind::Delete,
        type_name: model.type_name.clone(),
        operation: Operation::Delete {
            relation: model.relation.clone(),
            key_column: pk.column.clone(),
            key,
        },
        new_version: None,
    })
}

fn primary_key(model: &TypeModel) -> Result<&AttributeModel, CoreError> {
    // A sealed registry guarantees exactly one primary key.
    model.primary_key().ok_or_else(|| {
        SessionError::internal(format!("type '{}' has no primary key", model.type_name)).into()
    })
}

fn check_value(
    model: &TypeModel,
    attribute: &str,
    ty: ScalarType,
    nullable: bool,
    value: &Value,
) -> Result<(), CoreError> {
    if ty.admits(value, nullable) {
        return Ok(());
    }

    Err(SessionError::AttributeValue {
        type_name: model.type_name.clone(),
        attribute: attribute.to_string(),
        ty,
        value: value.clone(),
    }
    .into())
}
