use crate::{
    db::{
        query::{CompareOp, Predicate, QueryError, translate, translate_key},
        store::Page,
    },
    model::TypeModel,
    value::{ScalarType, Value},
};

fn order_model() -> TypeModel {
    TypeModel::new("Order", "orders")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("total", "amount_minor", ScalarType::Uint)
        .nullable_attribute("note", "note", ScalarType::Text)
        .attribute("payload", "payload", ScalarType::Blob)
}

#[test]
fn translation_maps_attributes_to_columns() {
    let predicate = Predicate::eq("total", Value::Uint(10)) & Predicate::gt("id", Value::Uint(5));
    let select = translate(&order_model(), &predicate, Page::default()).unwrap();

    assert_eq!(select.relation, "orders");
    assert_eq!(select.filters.len(), 2);
    assert_eq!(select.filters[0].column, "amount_minor");
    assert_eq!(select.filters[0].op, CompareOp::Eq);
    assert_eq!(select.filters[1].column, "id");
}

#[test]
fn pagination_passes_through_opaquely() {
    let page = Page::default().offset(20).limit(10);
    let select = translate(&order_model(), &Predicate::all(), page).unwrap();

    assert_eq!(select.page.offset, Some(20));
    assert_eq!(select.page.limit, Some(10));
    assert!(select.filters.is_empty());
}

#[test]
fn unknown_attribute_is_rejected() {
    let err = translate(
        &order_model(),
        &Predicate::eq("totl", Value::Uint(10)),
        Page::default(),
    )
    .unwrap_err();

    assert_eq!(
        err,
        QueryError::UnknownAttribute {
            type_name: "Order".to_string(),
            attribute: "totl".to_string(),
        }
    );
}

#[test]
fn text_comparators_are_unsupported() {
    let err = translate(
        &order_model(),
        &Predicate::contains("note", Value::text("x")),
        Page::default(),
    )
    .unwrap_err();

    assert_eq!(
        err,
        QueryError::UnsupportedPredicate {
            op: CompareOp::Contains
        }
    );
}

#[test]
fn ordering_on_blob_is_rejected() {
    let err = translate(
        &order_model(),
        &Predicate::lt("payload", Value::Blob(vec![1])),
        Page::default(),
    )
    .unwrap_err();

    assert!(matches!(err, QueryError::UnorderedAttribute { .. }));
}

#[test]
fn literal_type_mismatch_is_rejected() {
    let err = translate(
        &order_model(),
        &Predicate::eq("total", Value::text("ten")),
        Page::default(),
    )
    .unwrap_err();

    assert!(matches!(err, QueryError::LiteralType { .. }));
}

#[test]
fn null_literal_requires_nullable_attribute() {
    // note is nullable: fine.
    assert!(
        translate(
            &order_model(),
            &Predicate::eq("note", Value::Null),
            Page::default()
        )
        .is_ok()
    );
    // total is not.
    assert!(matches!(
        translate(
            &order_model(),
            &Predicate::eq("total", Value::Null),
            Page::default()
        ),
        Err(QueryError::LiteralType { .. })
    ));
}

#[test]
fn membership_checks_every_member() {
    let ok = Predicate::in_("total", vec![Value::Uint(1), Value::Uint(2)]);
    assert!(translate(&order_model(), &ok, Page::default()).is_ok());

    let bad = Predicate::in_("total", vec![Value::Uint(1), Value::text("2")]);
    assert!(matches!(
        translate(&order_model(), &bad, Page::default()),
        Err(QueryError::LiteralType { .. })
    ));
}

#[test]
fn key_lookup_translates_to_pk_equality() {
    let select = translate_key(&order_model(), &Value::Uint(7)).unwrap();

    assert_eq!(select.filters.len(), 1);
    assert_eq!(select.filters[0].column, "id");
    assert_eq!(select.filters[0].op, CompareOp::Eq);
    assert_eq!(select.filters[0].value, Value::Uint(7));
}

#[test]
fn key_lookup_type_checks_the_key() {
    assert!(matches!(
        translate_key(&order_model(), &Value::text("7")),
        Err(QueryError::LiteralType { .. })
    ));
}
