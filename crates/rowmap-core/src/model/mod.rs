//! Mapping metadata: declared type descriptors and the sealed registry.
//!
//! Descriptors are explicit data built by application code at process start.
//! Registration validates them eagerly so translation and flush failures
//! surface before any store call.

mod mapped;
mod registry;

#[cfg(test)]
mod tests;

pub use mapped::{AttributeModel, Cardinality, RelationModel, TypeModel};
pub use registry::{MappingError, Registry, RegistryBuilder};
