//! Store-adapter boundary.
//!
//! The engine never touches a physical store: it emits [`Operation`]s and
//! consumes [`StoreResponse`]s. Adapters execute synchronously; any I/O
//! wait happens inside [`StoreAdapter::execute`]. One adapter may serve
//! many sessions concurrently, so implementations guard their own state.

pub mod memory;

use crate::{db::query::CompareOp, value::Value};
use serde::Serialize;
use thiserror::Error as ThisError;

///
/// StoreAdapter
///

pub trait StoreAdapter {
    /// Execute one operation, blocking until the store answers.
    fn execute(&self, operation: Operation) -> Result<StoreResponse, AdapterError>;
}

///
/// Operation
///
/// A pending store action. Produced during flush or query translation,
/// ordered by the unit of work, consumed exactly once by the adapter.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Operation {
    /// Insert a row. `key` is present when the caller assigned the primary
    /// key; otherwise the store assigns one and reports it back.
    Insert {
        relation: String,
        key_column: String,
        key: Option<Value>,
        values: Vec<(String, Value)>,
    },

    /// Update the changed columns of one row. `expected_version` carries
    /// the (column, value) pair the store must see for the write to apply;
    /// a mismatch is a concurrency conflict.
    Update {
        relation: String,
        key_column: String,
        key: Value,
        changed: Vec<(String, Value)>,
        expected_version: Option<(String, Value)>,
    },

    /// Delete one row by primary key.
    Delete {
        relation: String,
        key_column: String,
        key: Value,
    },

    /// Fetch rows matching translated filters.
    Select(SelectOperation),
}

impl Operation {
    #[must_use]
    pub fn relation(&self) -> &str {
        match self {
            Self::Insert { relation, .. }
            | Self::Update { relation, .. }
            | Self::Delete { relation, .. } => relation,
            Self::Select(select) => &select.relation,
        }
    }

    #[must_use]
    pub const fn is_write(&self) -> bool {
        !matches!(self, Self::Select(_))
    }
}

///
/// SelectOperation
/// Store-level query description produced by translation; never executed
/// by the translator itself.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SelectOperation {
    pub relation: String,
    pub filters: Vec<ColumnFilter>,
    pub page: Page,
}

///
/// ColumnFilter
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ColumnFilter {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

///
/// Page
/// Pagination bounds, passed through to the store untouched.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Page {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl Page {
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

///
/// StoreRow
/// One raw row as returned by the adapter: column name / value pairs.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StoreRow {
    pub columns: Vec<(String, Value)>,
}

impl StoreRow {
    #[must_use]
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

///
/// StoreResponse
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreResponse {
    /// Rows affected by an update or delete.
    Affected(u64),
    /// The primary key assigned (or confirmed) by an insert.
    InsertedKey(Value),
    /// Rows matching a select.
    Rows(Vec<StoreRow>),
}

///
/// AdapterError
///
/// Failures reported by the store adapter. `Conflict` is the optimistic-
/// concurrency signal and is surfaced to callers unmodified; it is never
/// retried by the engine.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum AdapterError {
    #[error("concurrent modification detected: {relation}[{key}]")]
    Conflict { relation: String, key: Value },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

// ---- tests -------------------------------------------------------------
