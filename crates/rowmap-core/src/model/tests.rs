use crate::{
    model::{MappingError, RegistryBuilder, TypeModel},
    value::ScalarType,
};

// ---- fixtures ----------------------------------------------------------

fn customer() -> TypeModel {
    TypeModel::new("Customer", "customers")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("name", "name", ScalarType::Text)
        .has_many("orders", "Order", "customer_id")
}

fn order() -> TypeModel {
    TypeModel::new("Order", "orders")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("customer_id", "customer_id", ScalarType::Uint)
        .attribute("total", "total", ScalarType::Uint)
        .belongs_to("customer", "Customer", "customer_id")
}

// ---- registration ------------------------------------------------------

#[test]
fn registration_round_trips_through_resolve() {
    let registry = RegistryBuilder::new()
        .register(customer())
        .unwrap()
        .register(order())
        .unwrap()
        .build()
        .unwrap();

    let model = registry.resolve("Order").unwrap();
    assert_eq!(model.relation, "orders");
    assert_eq!(model.primary_key().unwrap().name, "id");
    assert_eq!(registry.len(), 2);
}

#[test]
fn resolve_unmapped_type_fails() {
    let registry = RegistryBuilder::new().build().unwrap();

    assert_eq!(
        registry.resolve("Ghost"),
        Err(MappingError::UnmappedType {
            type_name: "Ghost".to_string()
        })
    );
}

#[test]
fn identical_re_registration_is_idempotent() {
    let registry = RegistryBuilder::new()
        .register(customer())
        .unwrap()
        .register(customer())
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(registry.len(), 1);
}

#[test]
fn differing_re_registration_conflicts() {
    let changed = customer().attribute("email", "email", ScalarType::Text);
    let err = RegistryBuilder::new()
        .register(customer())
        .unwrap()
        .register(changed)
        .unwrap_err();

    assert_eq!(
        err,
        MappingError::Conflict {
            type_name: "Customer".to_string()
        }
    );
}

// ---- per-type validation -----------------------------------------------

#[test]
fn missing_primary_key_is_rejected() {
    let model = TypeModel::new("Tag", "tags").attribute("label", "label", ScalarType::Text);

    assert!(matches!(
        RegistryBuilder::new().register(model),
        Err(MappingError::MissingPrimaryKey { .. })
    ));
}

#[test]
fn multiple_primary_keys_are_rejected() {
    let model = TypeModel::new("Tag", "tags")
        .key_attribute("id", "id", ScalarType::Uint)
        .key_attribute("label", "label", ScalarType::Text);

    assert!(matches!(
        RegistryBuilder::new().register(model),
        Err(MappingError::MultiplePrimaryKeys { .. })
    ));
}

#[test]
fn unkeyable_key_type_is_rejected() {
    let model = TypeModel::new("Tag", "tags").key_attribute("id", "id", ScalarType::Float64);

    assert!(matches!(
        RegistryBuilder::new().register(model),
        Err(MappingError::UnkeyableKey { .. })
    ));
}

#[test]
fn duplicate_attribute_is_rejected() {
    let model = TypeModel::new("Tag", "tags")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("label", "label", ScalarType::Text)
        .attribute("label", "label2", ScalarType::Text);

    assert!(matches!(
        RegistryBuilder::new().register(model),
        Err(MappingError::DuplicateAttribute { .. })
    ));
}

#[test]
fn owning_side_foreign_key_must_exist() {
    let model = TypeModel::new("Order", "orders")
        .key_attribute("id", "id", ScalarType::Uint)
        .belongs_to("customer", "Customer", "customer_id");

    assert!(matches!(
        RegistryBuilder::new().register(model),
        Err(MappingError::UnknownForeignKey { .. })
    ));
}

#[test]
fn version_attribute_must_be_uint() {
    let model = TypeModel::new("Doc", "docs")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("revision", "revision", ScalarType::Text)
        .version("revision");

    assert!(matches!(
        RegistryBuilder::new().register(model),
        Err(MappingError::VersionType { .. })
    ));
}

// ---- cross-type validation ---------------------------------------------

#[test]
fn unknown_relationship_target_fails_at_seal() {
    let err = RegistryBuilder::new()
        .register(order())
        .unwrap()
        .build()
        .unwrap_err();

    assert!(matches!(err, MappingError::UnknownTarget { .. }));
}

#[test]
fn foreign_key_type_must_match_target_key() {
    let order = TypeModel::new("Order", "orders")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("customer_id", "customer_id", ScalarType::Text)
        .belongs_to("customer", "Customer", "customer_id");

    let err = RegistryBuilder::new()
        .register(customer())
        .unwrap()
        .register(order)
        .unwrap()
        .build()
        .unwrap_err();

    assert!(matches!(err, MappingError::ForeignKeyType { .. }));
}

// ---- insert ordering ---------------------------------------------------

#[test]
fn insert_order_puts_referenced_types_first() {
    let registry = RegistryBuilder::new()
        .register(order())
        .unwrap()
        .register(customer())
        .unwrap()
        .build()
        .unwrap();

    let order_rank = registry.insert_rank("Order").unwrap();
    let customer_rank = registry.insert_rank("Customer").unwrap();
    assert!(customer_rank < order_rank);
}

#[test]
fn insert_order_chains_through_three_levels() {
    let line = TypeModel::new("OrderLine", "order_lines")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("order_id", "order_id", ScalarType::Uint)
        .belongs_to("order", "Order", "order_id");

    let registry = RegistryBuilder::new()
        .register(line)
        .unwrap()
        .register(order())
        .unwrap()
        .register(customer())
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        registry.insert_order(),
        ["Customer".to_string(), "Order".to_string(), "OrderLine".to_string()]
    );
}

#[test]
fn required_relation_cycle_fails_at_seal() {
    let a = TypeModel::new("A", "a")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("b_id", "b_id", ScalarType::Uint)
        .belongs_to("b", "B", "b_id");
    let b = TypeModel::new("B", "b")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("a_id", "a_id", ScalarType::Uint)
        .belongs_to("a", "A", "a_id");

    let err = RegistryBuilder::new()
        .register(a)
        .unwrap()
        .register(b)
        .unwrap()
        .build()
        .unwrap_err();

    assert!(matches!(err, MappingError::RelationCycle { .. }));
}

#[test]
fn nullable_foreign_key_breaks_a_cycle() {
    let a = TypeModel::new("A", "a")
        .key_attribute("id", "id", ScalarType::Uint)
        .nullable_attribute("b_id", "b_id", ScalarType::Uint)
        .belongs_to("b", "B", "b_id");
    let b = TypeModel::new("B", "b")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("a_id", "a_id", ScalarType::Uint)
        .belongs_to("a", "A", "a_id");

    let registry = RegistryBuilder::new()
        .register(a)
        .unwrap()
        .register(b)
        .unwrap()
        .build()
        .unwrap();

    // The required edge A → B must still be honored.
    assert!(registry.insert_rank("A").unwrap() < registry.insert_rank("B").unwrap());
}
