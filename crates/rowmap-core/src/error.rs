use crate::{
    db::{
        identity::IdentityError,
        query::QueryError,
        session::{HydrateError, SessionError},
        unit::FlushError,
    },
    model::MappingError,
};
use thiserror::Error as ThisError;

///
/// CoreError
///
/// Engine-level error union. Each component keeps its own typed error; the
/// facade crate flattens this union into the public kind/origin taxonomy.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CoreError {
    #[error(transparent)]
    Flush(#[from] FlushError),

    #[error(transparent)]
    Hydrate(#[from] HydrateError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
