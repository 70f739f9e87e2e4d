use crate::{
    db::store::StoreRow,
    model::TypeModel,
    value::{ScalarType, Value},
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// HydrateError
///
/// Row-to-instance mapping failures. Rows come from the store, so a shape
/// mismatch here means the store and the mapping metadata disagree —
/// corruption-class, not caller misuse.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum HydrateError {
    #[error("row for '{type_name}' is missing required column '{column}'")]
    MissingColumn { type_name: String, column: String },

    #[error("row for '{type_name}' is missing its primary-key column '{column}'")]
    MissingKey { type_name: String, column: String },

    #[error("column '{column}' on '{type_name}' holds {value}, expected {ty}")]
    ColumnType {
        type_name: String,
        column: String,
        ty: ScalarType,
        value: Value,
    },
}

/// Map one store row onto (primary key, attribute values).
///
/// Columns resolve through the mapping; a missing nullable column hydrates
/// to null, a missing required one is an error.
pub(crate) fn hydrate_row(
    model: &TypeModel,
    row: &StoreRow,
) -> Result<(Value, BTreeMap<String, Value>), HydrateError> {
    let mut key = None;
    let mut values = BTreeMap::new();

    for attr in &model.attributes {
        let value = match row.get(&attr.column) {
            Some(value) => value.clone(),
            None if attr.nullable => Value::Null,
            None => {
                return Err(HydrateError::MissingColumn {
                    type_name: model.type_name.clone(),
                    column: attr.column.clone(),
                });
            }
        };

        if !attr.ty.admits(&value, attr.nullable) {
            return Err(HydrateError::ColumnType {
                type_name: model.type_name.clone(),
                column: attr.column.clone(),
                ty: attr.ty,
                value,
            });
        }

        if attr.primary_key {
            key = Some(value.clone());
        }
        values.insert(attr.name.clone(), value);
    }

    let Some(key) = key else {
        let column = model
            .primary_key()
            .map_or_else(|| "<primary key>".to_string(), |pk| pk.column.clone());
        return Err(HydrateError::MissingKey {
            type_name: model.type_name.clone(),
            column,
        });
    };

    Ok((key, values))
}

// ---- tests -------------------------------------------------------------
