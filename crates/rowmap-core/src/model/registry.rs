use crate::{
    model::{Cardinality, TypeModel},
    value::ScalarType,
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

///
/// MappingError
///
/// Declarative-metadata violations, detected at registration or seal time.
/// Fatal to startup; a registry that fails to seal never serves sessions.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum MappingError {
    #[error("type '{type_name}' is already registered with a different mapping")]
    Conflict { type_name: String },

    #[error("type '{type_name}' declares attribute '{attribute}' more than once")]
    DuplicateAttribute { type_name: String, attribute: String },

    #[error("type '{type_name}' maps column '{column}' more than once")]
    DuplicateColumn { type_name: String, column: String },

    #[error("type '{type_name}' declares relationship '{relationship}' more than once")]
    DuplicateRelationship {
        type_name: String,
        relationship: String,
    },

    #[error("type '{type_name}' declares an attribute with an empty name")]
    EmptyAttributeName { type_name: String },

    #[error("type '{type_name}' maps onto an empty relation name")]
    EmptyRelation { type_name: String },

    #[error("cannot register a type with an empty name")]
    EmptyTypeName,

    #[error(
        "relationship '{relationship}' on '{type_name}': foreign key is {found}, target key is {expected}"
    )]
    ForeignKeyType {
        type_name: String,
        relationship: String,
        expected: ScalarType,
        found: ScalarType,
    },

    #[error("type '{type_name}' declares no primary-key attribute")]
    MissingPrimaryKey { type_name: String },

    #[error("type '{type_name}' declares more than one primary-key attribute")]
    MultiplePrimaryKeys { type_name: String },

    #[error("primary-key attribute '{attribute}' on '{type_name}' must not be nullable")]
    NullableKey { type_name: String, attribute: String },

    #[error("required relationships form a cycle; no insert order exists: {types}")]
    RelationCycle { types: String },

    #[error("primary-key attribute '{attribute}' on '{type_name}' has unkeyable type {ty}")]
    UnkeyableKey {
        type_name: String,
        attribute: String,
        ty: ScalarType,
    },

    #[error(
        "relationship '{relationship}' on '{type_name}' names foreign-key attribute '{attribute}', which does not exist"
    )]
    UnknownForeignKey {
        type_name: String,
        relationship: String,
        attribute: String,
    },

    #[error("relationship '{relationship}' on '{type_name}' targets unregistered type '{target}'")]
    UnknownTarget {
        type_name: String,
        relationship: String,
        target: String,
    },

    #[error("type '{type_name}' names version attribute '{attribute}', which does not exist")]
    UnknownVersionAttribute { type_name: String, attribute: String },

    #[error("type '{type_name}' is not mapped")]
    UnmappedType { type_name: String },

    #[error("version attribute '{attribute}' on '{type_name}' must be a non-nullable uint")]
    VersionType { type_name: String, attribute: String },
}

///
/// RegistryBuilder
///
/// Accumulates descriptors, validating each one eagerly. Cross-type checks
/// (relationship targets, foreign-key shapes, insert order) run at seal
/// time in [`RegistryBuilder::build`].
///

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: BTreeMap<String, TypeModel>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one type descriptor.
    ///
    /// Idempotent on identical input; a differing descriptor under an
    /// already-registered name fails with [`MappingError::Conflict`].
    pub fn register(mut self, model: TypeModel) -> Result<Self, MappingError> {
        validate_type(&model)?;

        if let Some(existing) = self.types.get(&model.type_name) {
            if *existing == model {
                return Ok(self);
            }
            return Err(MappingError::Conflict {
                type_name: model.type_name,
            });
        }

        self.types.insert(model.type_name.clone(), model);

        Ok(self)
    }

    /// Run cross-type validation and seal the registry.
    pub fn build(self) -> Result<Registry, MappingError> {
        for model in self.types.values() {
            validate_relationships(model, &self.types)?;
        }

        let insert_order = insert_order(&self.types)?;

        Ok(Registry {
            types: self.types,
            insert_order,
        })
    }
}

///
/// Registry
///
/// Sealed, read-only mapping metadata. Constructed once before any session
/// opens and shared across sessions as `Arc<Registry>`; never a process
/// global.
///

#[derive(Debug)]
pub struct Registry {
    types: BTreeMap<String, TypeModel>,
    insert_order: Vec<String>,
}

impl Registry {
    /// Resolve a type descriptor by name.
    pub fn resolve(&self, type_name: &str) -> Result<&TypeModel, MappingError> {
        self.types
            .get(type_name)
            .ok_or_else(|| MappingError::UnmappedType {
                type_name: type_name.to_string(),
            })
    }

    /// Topological insert order: referenced types before referencing ones.
    #[must_use]
    pub fn insert_order(&self) -> &[String] {
        &self.insert_order
    }

    /// Position of a type in the insert order.
    #[must_use]
    pub fn insert_rank(&self, type_name: &str) -> Option<usize> {
        self.insert_order.iter().position(|name| name == type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeModel> {
        self.types.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ---- per-type validation -----------------------------------------------

fn validate_type(model: &TypeModel) -> Result<(), MappingError> {
    let type_name = &model.type_name;
    if type_name.is_empty() {
        return Err(MappingError::EmptyTypeName);
    }
    if model.relation.is_empty() {
        return Err(MappingError::EmptyRelation {
            type_name: type_name.clone(),
        });
    }

    // Attribute identity: names and columns unique, exactly one key.
    let mut names = BTreeSet::new();
    let mut columns = BTreeSet::new();
    let mut keys = 0usize;
    for attr in &model.attributes {
        if attr.name.is_empty() {
            return Err(MappingError::EmptyAttributeName {
                type_name: type_name.clone(),
            });
        }
        if !names.insert(attr.name.as_str()) {
            return Err(MappingError::DuplicateAttribute {
                type_name: type_name.clone(),
                attribute: attr.name.clone(),
            });
        }
        if !columns.insert(attr.column.as_str()) {
            return Err(MappingError::DuplicateColumn {
                type_name: type_name.clone(),
                column: attr.column.clone(),
            });
        }
        if attr.primary_key {
            keys += 1;
            if attr.nullable {
                return Err(MappingError::NullableKey {
                    type_name: type_name.clone(),
                    attribute: attr.name.clone(),
                });
            }
            if !attr.ty.is_keyable() {
                return Err(MappingError::UnkeyableKey {
                    type_name: type_name.clone(),
                    attribute: attr.name.clone(),
                    ty: attr.ty,
                });
            }
        }
    }
    match keys {
        0 => {
            return Err(MappingError::MissingPrimaryKey {
                type_name: type_name.clone(),
            });
        }
        1 => {}
        _ => {
            return Err(MappingError::MultiplePrimaryKeys {
                type_name: type_name.clone(),
            });
        }
    }

    // Relationship identity and owning-side foreign keys.
    let mut rel_names = BTreeSet::new();
    for rel in &model.relationships {
        if !rel_names.insert(rel.name.as_str()) {
            return Err(MappingError::DuplicateRelationship {
                type_name: type_name.clone(),
                relationship: rel.name.clone(),
            });
        }
        if rel.cardinality == Cardinality::One
            && model.attribute_named(&rel.fk_attribute).is_none()
        {
            return Err(MappingError::UnknownForeignKey {
                type_name: type_name.clone(),
                relationship: rel.name.clone(),
                attribute: rel.fk_attribute.clone(),
            });
        }
    }

    // Version attribute must exist and be a non-nullable uint.
    if let Some(version) = &model.version_attribute {
        let Some(attr) = model.attribute_named(version) else {
            return Err(MappingError::UnknownVersionAttribute {
                type_name: type_name.clone(),
                attribute: version.clone(),
            });
        };
        if attr.ty != ScalarType::Uint || attr.nullable {
            return Err(MappingError::VersionType {
                type_name: type_name.clone(),
                attribute: version.clone(),
            });
        }
    }

    Ok(())
}

// ---- cross-type validation ---------------------------------------------

fn validate_relationships(
    model: &TypeModel,
    types: &BTreeMap<String, TypeModel>,
) -> Result<(), MappingError> {
    for rel in &model.relationships {
        let Some(target) = types.get(&rel.target) else {
            return Err(MappingError::UnknownTarget {
                type_name: model.type_name.clone(),
                relationship: rel.name.clone(),
                target: rel.target.clone(),
            });
        };

        // The foreign key lives on the referencing side and must match the
        // referenced primary key's type.
        let (fk_owner, referenced) = match rel.cardinality {
            Cardinality::One => (model, target),
            Cardinality::Many => (target, model),
        };
        let Some(fk) = fk_owner.attribute_named(&rel.fk_attribute) else {
            return Err(MappingError::UnknownForeignKey {
                type_name: model.type_name.clone(),
                relationship: rel.name.clone(),
                attribute: rel.fk_attribute.clone(),
            });
        };
        let Some(pk) = referenced.primary_key() else {
            // Unreachable after per-type validation.
            return Err(MappingError::MissingPrimaryKey {
                type_name: referenced.type_name.clone(),
            });
        };
        if fk.ty != pk.ty {
            return Err(MappingError::ForeignKeyType {
                type_name: model.type_name.clone(),
                relationship: rel.name.clone(),
                expected: pk.ty,
                found: fk.ty,
            });
        }
    }

    Ok(())
}

// ---- insert ordering ---------------------------------------------------

// Edge parent → child: the parent type must insert before the child.
// Hard edges come from non-nullable foreign keys; nullable ones still shape
// the order but are ignored when breaking cycles.
fn dependency_edges(types: &BTreeMap<String, TypeModel>) -> BTreeSet<(String, String, bool)> {
    let mut edges = BTreeSet::new();
    for model in types.values() {
        for rel in &model.relationships {
            let (parent, child, fk_owner) = match rel.cardinality {
                Cardinality::One => (rel.target.clone(), model.type_name.clone(), model),
                Cardinality::Many => {
                    let Some(target) = types.get(&rel.target) else {
                        continue;
                    };
                    (model.type_name.clone(), rel.target.clone(), target)
                }
            };
            if parent == child {
                // Self-references never constrain the type-level order.
                continue;
            }
            let hard = fk_owner
                .attribute_named(&rel.fk_attribute)
                .is_some_and(|attr| !attr.nullable);
            edges.insert((parent, child, hard));
        }
    }
    edges
}

fn insert_order(types: &BTreeMap<String, TypeModel>) -> Result<Vec<String>, MappingError> {
    let edges = dependency_edges(types);

    if let Some(order) = topo_sort(types, &edges, false) {
        return Ok(order);
    }
    // A cycle through nullable foreign keys is satisfiable (the store sees
    // the reference later); only required edges make ordering impossible.
    if let Some(order) = topo_sort(types, &edges, true) {
        return Ok(order);
    }

    let cyclic = cyclic_types(types, &edges);
    Err(MappingError::RelationCycle {
        types: cyclic.join(", "),
    })
}

fn topo_sort(
    types: &BTreeMap<String, TypeModel>,
    edges: &BTreeSet<(String, String, bool)>,
    hard_only: bool,
) -> Option<Vec<String>> {
    let mut indegree: BTreeMap<&str, usize> =
        types.keys().map(|name| (name.as_str(), 0)).collect();
    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (parent, child, hard) in edges {
        if hard_only && !*hard {
            continue;
        }
        *indegree.get_mut(child.as_str())? += 1;
        children
            .entry(parent.as_str())
            .or_default()
            .push(child.as_str());
    }

    // Kahn's algorithm; the ready set is ordered so the result is
    // deterministic for a given registry.
    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut order = Vec::with_capacity(types.len());

    while let Some(name) = ready.pop_first() {
        order.push(name.to_string());
        for child in children.get(name).into_iter().flatten() {
            let degree = indegree.get_mut(*child)?;
            *degree -= 1;
            if *degree == 0 {
                ready.insert(*child);
            }
        }
    }

    (order.len() == types.len()).then_some(order)
}

// Types left with positive indegree under hard edges: the cycle members.
fn cyclic_types(
    types: &BTreeMap<String, TypeModel>,
    edges: &BTreeSet<(String, String, bool)>,
) -> Vec<String> {
    let mut indegree: BTreeMap<&str, usize> =
        types.keys().map(|name| (name.as_str(), 0)).collect();
    for (_, child, hard) in edges {
        if *hard && let Some(degree) = indegree.get_mut(child.as_str()) {
            *degree += 1;
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        let roots: Vec<&str> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        for root in roots {
            indegree.remove(root);
            for (parent, child, hard) in edges {
                if *hard
                    && parent == root
                    && let Some(degree) = indegree.get_mut(child.as_str())
                {
                    *degree -= 1;
                    changed = true;
                }
            }
        }
    }

    indegree.keys().map(ToString::to_string).collect()
}
