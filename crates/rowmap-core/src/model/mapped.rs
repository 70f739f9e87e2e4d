use crate::value::ScalarType;
use serde::Serialize;

///
/// TypeModel
///
/// Declared mapping for one domain type: target relation, ordered attribute
/// descriptors, and relationship descriptors. Built by application code
/// through the chainable constructors and validated at registration.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TypeModel {
    /// Stable type name used for identity-map keys and diagnostics.
    pub type_name: String,
    /// Storage relation (table) this type maps onto.
    pub relation: String,
    /// Ordered attribute list (authoritative for operation column order).
    pub attributes: Vec<AttributeModel>,
    /// Relationship descriptors keyed by relationship name.
    pub relationships: Vec<RelationModel>,
    /// Attribute carrying the optimistic-concurrency version, if declared.
    pub version_attribute: Option<String>,
}

impl TypeModel {
    /// Start a descriptor for `type_name` mapped onto `relation`.
    pub fn new(type_name: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            relation: relation.into(),
            attributes: Vec::new(),
            relationships: Vec::new(),
            version_attribute: None,
        }
    }

    /// Declare the primary-key attribute.
    #[must_use]
    pub fn key_attribute(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        ty: ScalarType,
    ) -> Self {
        self.attributes.push(AttributeModel {
            name: name.into(),
            column: column.into(),
            ty,
            nullable: false,
            primary_key: true,
        });
        self
    }

    /// Declare a non-nullable attribute.
    #[must_use]
    pub fn attribute(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        ty: ScalarType,
    ) -> Self {
        self.attributes.push(AttributeModel {
            name: name.into(),
            column: column.into(),
            ty,
            nullable: false,
            primary_key: false,
        });
        self
    }

    /// Declare a nullable attribute.
    #[must_use]
    pub fn nullable_attribute(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        ty: ScalarType,
    ) -> Self {
        self.attributes.push(AttributeModel {
            name: name.into(),
            column: column.into(),
            ty,
            nullable: true,
            primary_key: false,
        });
        self
    }

    /// Declare a to-one relationship: this type holds `fk_attribute`
    /// referencing the target's primary key.
    #[must_use]
    pub fn belongs_to(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        fk_attribute: impl Into<String>,
    ) -> Self {
        self.relationships.push(RelationModel {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::One,
            fk_attribute: fk_attribute.into(),
        });
        self
    }

    /// Declare a to-many relationship: the target holds `fk_attribute`
    /// referencing this type's primary key.
    #[must_use]
    pub fn has_many(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        fk_attribute: impl Into<String>,
    ) -> Self {
        self.relationships.push(RelationModel {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::Many,
            fk_attribute: fk_attribute.into(),
        });
        self
    }

    /// Declare the optimistic-concurrency version attribute.
    #[must_use]
    pub fn version(mut self, attribute: impl Into<String>) -> Self {
        self.version_attribute = Some(attribute.into());
        self
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Return the primary-key attribute.
    ///
    /// Registration guarantees exactly one; `None` only before validation.
    #[must_use]
    pub fn primary_key(&self) -> Option<&AttributeModel> {
        self.attributes.iter().find(|attr| attr.primary_key)
    }

    #[must_use]
    pub fn attribute_named(&self, name: &str) -> Option<&AttributeModel> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    #[must_use]
    pub fn relationship_named(&self, name: &str) -> Option<&RelationModel> {
        self.relationships.iter().find(|rel| rel.name == name)
    }
}

///
/// AttributeModel
/// Runtime attribute metadata used by translation and flush planning.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AttributeModel {
    /// Attribute name as used in predicates and instance values.
    pub name: String,
    /// Column name in the storage relation.
    pub column: String,
    /// Declared scalar type.
    pub ty: ScalarType,
    pub nullable: bool,
    pub primary_key: bool,
}

///
/// RelationModel
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RelationModel {
    pub name: String,
    /// Target type name; resolvable once the registry is sealed.
    pub target: String,
    pub cardinality: Cardinality,
    /// Foreign-key attribute: on the owning type for `One`, on the target
    /// type for `Many`.
    pub fk_attribute: String,
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Cardinality {
    Many,
    One,
}
