//! Core runtime for rowmap: mapping metadata, the per-session identity
//! map, change tracking, unit-of-work flush planning, query translation,
//! and the store-adapter boundary. The ergonomics live in the `rowmap`
//! facade crate.
#![warn(unreachable_pub)]

pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Domain vocabulary only. No errors, adapters, or helpers are re-exported
/// here.
///

pub mod prelude {
    pub use crate::{
        db::{
            Session,
            instance::{InstanceHandle, RelationState},
            query::Predicate,
            store::Page,
        },
        model::{Cardinality, Registry, RegistryBuilder, TypeModel},
        value::{ScalarType, Value},
    };
}
