use derive_more::Display;
use rowmap_core::{
    db::{
        query::QueryError as CoreQueryError,
        session::SessionError,
        unit::{FlushCause, FlushCursor},
    },
    error::CoreError,
    model::MappingError,
};
use serde::Serialize;
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured detail; the variant (if present) corresponds to
    /// the kind.
    pub detail: Option<ErrorDetail>,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// The flush success cursor, when this error carries one.
    #[must_use]
    pub const fn flush_cursor(&self) -> Option<&FlushCursor> {
        match &self.detail {
            Some(ErrorDetail::Flush(cursor)) => Some(cursor),
            None => None,
        }
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Mapping(inner) => {
                let kind = match inner {
                    MappingError::UnmappedType { .. } => MappingErrorKind::Unmapped,
                    MappingError::Conflict { .. } => MappingErrorKind::Conflict,
                    _ => MappingErrorKind::Invalid,
                };
                Self::new(ErrorKind::Mapping(kind), ErrorOrigin::Registry, message)
            }

            CoreError::Query(inner) => match inner {
                CoreQueryError::UnsupportedPredicate { .. } => Self::new(
                    ErrorKind::Query(QueryErrorKind::Unsupported),
                    ErrorOrigin::Query,
                    message,
                ),
                CoreQueryError::Execute(_) => Self::new(
                    ErrorKind::Query(QueryErrorKind::Execution),
                    ErrorOrigin::Store,
                    message,
                ),
                _ => Self::new(
                    ErrorKind::Query(QueryErrorKind::Invalid),
                    ErrorOrigin::Query,
                    message,
                ),
            },

            CoreError::Flush(inner) => {
                let kind = match &inner.cause {
                    FlushCause::Conflict { .. } => ErrorKind::Conflict,
                    FlushCause::Adapter(_) => ErrorKind::Flush,
                };
                Self {
                    kind,
                    origin: ErrorOrigin::Store,
                    message,
                    detail: Some(ErrorDetail::Flush(inner.cursor)),
                }
            }

            CoreError::Hydrate(_) => Self::new(ErrorKind::Internal, ErrorOrigin::Response, message),

            CoreError::Identity(_) => Self::new(ErrorKind::Session, ErrorOrigin::Session, message),

            CoreError::Session(inner) => match inner {
                SessionError::Internal { .. } => {
                    Self::new(ErrorKind::Internal, ErrorOrigin::Session, message)
                }
                _ => Self::new(ErrorKind::Session, ErrorOrigin::Session, message),
            },
        }
    }
}

impl From<MappingError> for Error {
    fn from(err: MappingError) -> Self {
        CoreError::Mapping(err).into()
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Mapping(MappingErrorKind),
    Query(QueryErrorKind),

    /// Partial flush failure; the detail carries the success cursor.
    Flush,

    /// Version mismatch detected by the store; never auto-retried.
    Conflict,

    /// Session misuse (state machine, foreign instances, bad values).
    Session,

    /// The caller cannot remediate this.
    Internal,
}

///
/// MappingErrorKind
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum MappingErrorKind {
    /// Declarative metadata is invalid.
    Invalid,

    /// Re-registration under the same name with a different mapping.
    Conflict,

    /// The type was never registered.
    Unmapped,
}

///
/// QueryErrorKind
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum QueryErrorKind {
    /// Query shape is invalid (unknown attributes, bad literals).
    Invalid,

    /// The query is valid but uses an unsupported comparator.
    Unsupported,

    /// The store failed while executing the select.
    Execution,

    /// Valid query, but no rows matched.
    NotFound,

    /// Query expected one row but matched many.
    NotUnique,
}

///
/// ErrorDetail
///

#[derive(Clone, Debug, Serialize, ThisError)]
pub enum ErrorDetail {
    #[error("flush cursor: {} completed, {} remaining", .0.completed.len(), .0.remaining)]
    Flush(FlushCursor),
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Query,
    Registry,
    Response,
    Session,
    Store,
}
