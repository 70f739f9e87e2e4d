use crate::{
    db::{
        query::{CompareClause, CompareOp, Predicate},
        store::{AdapterError, ColumnFilter, Page, SelectOperation},
    },
    model::{AttributeModel, TypeModel},
    value::{ScalarType, Value},
};
use thiserror::Error as ThisError;

///
/// QueryError
///
/// Translation failures are caller misuse and recoverable; `Execute` wraps
/// an adapter failure during query execution.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("attribute '{attribute}' is not mapped on type '{type_name}'")]
    UnknownAttribute { type_name: String, attribute: String },

    #[error("comparator {op:?} is not supported; supported: equality, ordering, set membership")]
    UnsupportedPredicate { op: CompareOp },

    #[error("ordering comparator on attribute '{attribute}' of unordered type {ty}")]
    UnorderedAttribute { attribute: String, ty: ScalarType },

    #[error("set-membership comparator on '{attribute}' requires a list literal, got {value}")]
    NonListMembership { attribute: String, value: Value },

    #[error("literal {value} does not match attribute '{attribute}' ({ty})")]
    LiteralType {
        attribute: String,
        ty: ScalarType,
        value: Value,
    },

    #[error("select failed: {0}")]
    Execute(#[from] AdapterError),
}

/// Translate an object-level predicate into a store select.
///
/// Resolves each attribute against the mapping, type-checks literals, and
/// maps attribute names to column names. Pagination passes through
/// opaquely. Never executes anything.
pub fn translate(
    model: &TypeModel,
    predicate: &Predicate,
    page: Page,
) -> Result<SelectOperation, QueryError> {
    let mut filters = Vec::with_capacity(predicate.clauses().len());
    for clause in predicate.clauses() {
        filters.push(translate_clause(model, clause)?);
    }

    Ok(SelectOperation {
        relation: model.relation.clone(),
        filters,
        page,
    })
}

/// Translate a primary-key lookup into a single-row select.
pub fn translate_key(model: &TypeModel, key: &Value) -> Result<SelectOperation, QueryError> {
    let pk = primary_key(model)?;
    check_literal(pk, key)?;

    Ok(SelectOperation {
        relation: model.relation.clone(),
        filters: vec![ColumnFilter {
            column: pk.column.clone(),
            op: CompareOp::Eq,
            value: key.clone(),
        }],
        page: Page::default(),
    })
}

fn translate_clause(model: &TypeModel, clause: &CompareClause) -> Result<ColumnFilter, QueryError> {
    if !clause.op.is_supported() {
        return Err(QueryError::UnsupportedPredicate { op: clause.op });
    }

    let Some(attr) = model.attribute_named(&clause.attribute) else {
        return Err(QueryError::UnknownAttribute {
            type_name: model.type_name.clone(),
            attribute: clause.attribute.clone(),
        });
    };

    if clause.op.is_ordering() && !attr.ty.supports_ordering() {
        return Err(QueryError::UnorderedAttribute {
            attribute: attr.name.clone(),
            ty: attr.ty,
        });
    }

    if clause.op.is_membership() {
        let Value::List(members) = &clause.value else {
            return Err(QueryError::NonListMembership {
                attribute: attr.name.clone(),
                value: clause.value.clone(),
            });
        };
        for member in members {
            check_literal(attr, member)?;
        }
    } else {
        check_literal(attr, &clause.value)?;
    }

    Ok(ColumnFilter {
        column: attr.column.clone(),
        op: clause.op,
        value: clause.value.clone(),
    })
}

fn check_literal(attr: &AttributeModel, value: &Value) -> Result<(), QueryError> {
    // Null literals are admissible against nullable attributes only; a
    // comparison against null matches nothing but is not a type error.
    if attr.ty.admits(value, attr.nullable) {
        return Ok(());
    }

    Err(QueryError::LiteralType {
        attribute: attr.name.clone(),
        ty: attr.ty,
        value: value.clone(),
    })
}

fn primary_key(model: &TypeModel) -> Result<&AttributeModel, QueryError> {
    // A sealed registry guarantees the key exists; translation against an
    // unsealed model is a caller error surfaced as an unknown attribute.
    model
        .primary_key()
        .ok_or_else(|| QueryError::UnknownAttribute {
            type_name: model.type_name.clone(),
            attribute: "<primary key>".to_string(),
        })
}
