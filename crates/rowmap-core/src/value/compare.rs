use crate::value::Value;
use std::cmp::Ordering;

///
/// Canonical Value Comparison
///
/// Total order over all values: cross-variant rank first, then per-variant
/// comparison. The order is deterministic and used for keying ordered maps;
/// it is not a semantic "less than" across variants.
///

// Rank must stay aligned with the sorted variant order of `Value`.
#[must_use]
pub(crate) const fn canonical_rank(value: &Value) -> u8 {
    match value {
        Value::Blob(_) => 0,
        Value::Bool(_) => 1,
        Value::Float64(_) => 2,
        Value::Int(_) => 3,
        Value::List(_) => 4,
        Value::Null => 5,
        Value::Text(_) => 6,
        Value::Uint(_) => 7,
        Value::Ulid(_) => 8,
    }
}

/// Total order over values: rank, then per-variant compare.
///
/// Floats use IEEE total ordering so NaN sorts deterministically; lists
/// compare lexicographically.
#[must_use]
pub fn strict_value_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Blob(x), Value::Blob(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Float64(x), Value::Float64(y)) => x.total_cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::List(x), Value::List(y)) => {
            for (xi, yi) in x.iter().zip(y.iter()) {
                let ord = strict_value_order(xi, yi);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Uint(x), Value::Uint(y)) => x.cmp(y),
        (Value::Ulid(x), Value::Ulid(y)) => x.cmp(y),
        _ => canonical_rank(a).cmp(&canonical_rank(b)),
    }
}

/// Semantic ordering for comparator evaluation.
///
/// Defined only between two non-null values of the same orderable scalar
/// type; everything else returns `None` and the comparison does not match.
#[must_use]
pub fn compare_order(a: &Value, b: &Value) -> Option<Ordering> {
    let (ta, tb) = (a.scalar_type()?, b.scalar_type()?);
    if ta != tb || !ta.supports_ordering() {
        return None;
    }

    Some(strict_value_order(a, b))
}
