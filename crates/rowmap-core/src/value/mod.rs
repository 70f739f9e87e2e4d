mod compare;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use ulid::Ulid;
use std::{
    cmp::Ordering,
    fmt::{self, Display},
};

pub use compare::{compare_order, strict_value_order};

///
/// Value
///
/// Scalar values crossing the store-adapter boundary: attribute values,
/// primary keys, and predicate literals.
///
/// Null → the attribute holds no value (SQL NULL).
/// List → right-hand side of set-membership comparators; never an attribute
///        value on its own.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
#[remain::sorted]
pub enum Value {
    Blob(Vec<u8>),
    Bool(bool),
    Float64(f64),
    Int(i64),
    List(Vec<Value>),
    Null,
    Text(String),
    Uint(u64),
    Ulid(Ulid),
}

impl Value {
    /// Construct a float value with NaN collapsed to one canonical bit
    /// pattern so value equality stays an equivalence relation.
    #[must_use]
    pub fn float(value: f64) -> Self {
        if value.is_nan() {
            Self::Float64(f64::NAN)
        } else {
            Self::Float64(value)
        }
    }

    /// Construct a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Return the scalar type of this value, or `None` for `Null` and
    /// `List`, which have no scalar counterpart.
    #[must_use]
    pub const fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Self::Blob(_) => Some(ScalarType::Blob),
            Self::Bool(_) => Some(ScalarType::Bool),
            Self::Float64(_) => Some(ScalarType::Float64),
            Self::Int(_) => Some(ScalarType::Int),
            Self::Text(_) => Some(ScalarType::Text),
            Self::Uint(_) => Some(ScalarType::Uint),
            Self::Ulid(_) => Some(ScalarType::Ulid),
            Self::List(_) | Self::Null => None,
        }
    }

    #[must_use]
    pub const fn as_uint(&self) -> Option<u64> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Return true if this value can serve as a primary-key value.
    #[must_use]
    pub fn is_keyable(&self) -> bool {
        self.scalar_type().is_some_and(ScalarType::is_keyable)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        strict_value_order(self, other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        strict_value_order(self, other)
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob(bytes) => write!(f, "blob({} bytes)", bytes.len()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Self::Null => write!(f, "null"),
            Self::Text(v) => write!(f, "'{v}'"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Ulid(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Ulid> for Value {
    fn from(value: Ulid) -> Self {
        Self::Ulid(value)
    }
}

///
/// ScalarType
///
/// Declared attribute types; mirrors the scalar `Value` variants.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum ScalarType {
    Blob,
    Bool,
    Float64,
    Int,
    Text,
    Uint,
    Ulid,
}

impl ScalarType {
    /// Return true if attributes of this type may carry a primary key.
    #[must_use]
    pub const fn is_keyable(self) -> bool {
        matches!(self, Self::Int | Self::Text | Self::Uint | Self::Ulid)
    }

    /// Return true if ordering comparators are defined for this type.
    #[must_use]
    pub const fn supports_ordering(self) -> bool {
        !matches!(self, Self::Blob)
    }

    /// Return true if `value` is admissible for an attribute of this type
    /// with the given nullability.
    #[must_use]
    pub fn admits(self, value: &Value, nullable: bool) -> bool {
        match value {
            Value::Null => nullable,
            other => other.scalar_type() == Some(self),
        }
    }
}

impl Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Blob => "blob",
            Self::Bool => "bool",
            Self::Float64 => "float64",
            Self::Int => "int",
            Self::Text => "text",
            Self::Uint => "uint",
            Self::Ulid => "ulid",
        };
        write!(f, "{label}")
    }
}
