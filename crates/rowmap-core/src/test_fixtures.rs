//! Shared fixtures: a small commerce schema exercising keys, nullable
//! attributes, both relationship cardinalities, and versioning.

use crate::{
    model::{Registry, RegistryBuilder, TypeModel},
    value::{ScalarType, Value},
};
use std::{collections::BTreeMap, sync::Arc};

pub(crate) fn commerce_registry() -> Arc<Registry> {
    let customer = TypeModel::new("Customer", "customers")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("name", "name", ScalarType::Text)
        .nullable_attribute("email", "email", ScalarType::Text)
        .has_many("orders", "Order", "customer_id");

    let order = TypeModel::new("Order", "orders")
        .key_attribute("id", "id", ScalarType::Uint)
        .nullable_attribute("customer_id", "customer_id", ScalarType::Uint)
        .attribute("total", "total", ScalarType::Uint)
        .belongs_to("customer", "Customer", "customer_id");

    let registry = RegistryBuilder::new()
        .register(customer)
        .expect("customer model is valid")
        .register(order)
        .expect("order model is valid")
        .build()
        .expect("commerce registry seals");

    Arc::new(registry)
}

pub(crate) fn versioned_registry() -> Arc<Registry> {
    let doc = TypeModel::new("Doc", "docs")
        .key_attribute("id", "id", ScalarType::Uint)
        .attribute("body", "body", ScalarType::Text)
        .attribute("version", "version", ScalarType::Uint)
        .version("version");

    let registry = RegistryBuilder::new()
        .register(doc)
        .expect("doc model is valid")
        .build()
        .expect("versioned registry seals");

    Arc::new(registry)
}

pub(crate) fn customer_values(name: &str) -> BTreeMap<String, Value> {
    BTreeMap::from([("name".to_string(), Value::text(name))])
}

pub(crate) fn order_values(total: u64) -> BTreeMap<String, Value> {
    BTreeMap::from([("total".to_string(), Value::Uint(total))])
}

pub(crate) fn order_values_for(customer_id: u64, total: u64) -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("customer_id".to_string(), Value::Uint(customer_id)),
        ("total".to_string(), Value::Uint(total)),
    ])
}
