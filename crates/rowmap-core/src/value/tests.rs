use crate::value::{ScalarType, Value, compare_order, strict_value_order};
use proptest::prelude::*;
use std::cmp::Ordering;
use ulid::Ulid;

// ---- helpers -----------------------------------------------------------

fn v_i(x: i64) -> Value {
    Value::Int(x)
}
fn v_u(x: u64) -> Value {
    Value::Uint(x)
}
fn v_txt(s: &str) -> Value {
    Value::text(s)
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::Uint),
        any::<f64>().prop_map(Value::float),
        "[a-z]{0,8}".prop_map(Value::text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Blob),
        Just(Value::Null),
    ]
}

// ---- equality ----------------------------------------------------------

#[test]
fn equality_is_by_value_within_variant() {
    assert_eq!(v_i(42), v_i(42));
    assert_ne!(v_i(42), v_i(43));
    assert_eq!(v_txt("a"), v_txt("a"));
    assert_ne!(v_txt("a"), v_txt("b"));
    assert_eq!(Value::Null, Value::Null);
}

#[test]
fn equality_never_crosses_variants() {
    // 1u64 and 1i64 are distinct values; coercion is not equality.
    assert_ne!(v_u(1), v_i(1));
    assert_ne!(v_txt("1"), v_u(1));
    assert_ne!(Value::Null, v_u(0));
}

#[test]
fn nan_equals_itself() {
    assert_eq!(Value::float(f64::NAN), Value::float(f64::NAN));
}

// ---- ordering ----------------------------------------------------------

#[test]
fn strict_order_is_rank_then_value() {
    // Cross-variant: rank decides.
    assert_eq!(
        strict_value_order(&Value::Bool(true), &v_i(0)),
        Ordering::Less
    );
    // Same variant: value decides.
    assert_eq!(strict_value_order(&v_u(1), &v_u(2)), Ordering::Less);
    assert_eq!(strict_value_order(&v_txt("b"), &v_txt("a")), Ordering::Greater);
}

#[test]
fn list_order_is_lexicographic() {
    let a = Value::List(vec![v_u(1), v_u(2)]);
    let b = Value::List(vec![v_u(1), v_u(3)]);
    let c = Value::List(vec![v_u(1)]);

    assert_eq!(strict_value_order(&a, &b), Ordering::Less);
    assert_eq!(strict_value_order(&c, &a), Ordering::Less);
}

#[test]
fn compare_order_requires_same_orderable_type() {
    assert_eq!(compare_order(&v_u(1), &v_u(2)), Some(Ordering::Less));
    assert_eq!(compare_order(&v_u(1), &v_i(2)), None);
    assert_eq!(compare_order(&Value::Null, &v_u(1)), None);
    assert_eq!(
        compare_order(&Value::Blob(vec![1]), &Value::Blob(vec![2])),
        None
    );
}

proptest! {
    #[test]
    fn strict_order_is_total_and_consistent(a in arb_value(), b in arb_value()) {
        let ab = strict_value_order(&a, &b);
        let ba = strict_value_order(&b, &a);
        prop_assert_eq!(ab, ba.reverse());
        prop_assert_eq!(ab == Ordering::Equal, a == b);
    }

    #[test]
    fn strict_order_is_reflexive(a in arb_value()) {
        prop_assert_eq!(strict_value_order(&a, &a), Ordering::Equal);
    }
}

// ---- scalar types ------------------------------------------------------

#[test]
fn scalar_type_mirrors_variants() {
    assert_eq!(v_u(1).scalar_type(), Some(ScalarType::Uint));
    assert_eq!(v_txt("x").scalar_type(), Some(ScalarType::Text));
    assert_eq!(Value::Ulid(Ulid::from_parts(1, 2)).scalar_type(), Some(ScalarType::Ulid));
    assert_eq!(Value::Null.scalar_type(), None);
    assert_eq!(Value::List(vec![]).scalar_type(), None);
}

#[test]
fn keyable_types_are_the_identifier_scalars() {
    assert!(ScalarType::Int.is_keyable());
    assert!(ScalarType::Uint.is_keyable());
    assert!(ScalarType::Text.is_keyable());
    assert!(ScalarType::Ulid.is_keyable());
    assert!(!ScalarType::Bool.is_keyable());
    assert!(!ScalarType::Blob.is_keyable());
    assert!(!ScalarType::Float64.is_keyable());
}

#[test]
fn admits_respects_type_and_nullability() {
    assert!(ScalarType::Uint.admits(&v_u(1), false));
    assert!(!ScalarType::Uint.admits(&v_i(1), false));
    assert!(!ScalarType::Uint.admits(&Value::Null, false));
    assert!(ScalarType::Uint.admits(&Value::Null, true));
}
