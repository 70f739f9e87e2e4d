use crate::{
    db::{
        instance::{Instance, InstanceId},
        tracker::{ChangeKind, ChangeTracker},
    },
    value::Value,
};
use std::collections::BTreeMap;

fn order(id: u64, key: Option<u64>, total: u64) -> Instance {
    Instance::new(
        InstanceId(id),
        "Order",
        key.map(Value::Uint),
        BTreeMap::from([("total".to_string(), Value::Uint(total))]),
    )
}

#[test]
fn clean_instance_diffs_empty_and_classifies_unchanged() {
    let mut tracker = ChangeTracker::new();
    let instance = order(1, Some(1), 10);
    tracker.snapshot(&instance);

    assert!(tracker.diff(&instance).is_empty());
    assert_eq!(tracker.classify(&instance), ChangeKind::Unchanged);
}

#[test]
fn mutation_shows_up_in_diff() {
    let mut tracker = ChangeTracker::new();
    let mut instance = order(1, Some(1), 10);
    tracker.snapshot(&instance);

    instance.set("total", Value::Uint(15));

    assert_eq!(
        tracker.diff(&instance),
        vec![("total".to_string(), Value::Uint(15))]
    );
    assert_eq!(
        tracker.classify(&instance),
        ChangeKind::Update {
            changed: vec![("total".to_string(), Value::Uint(15))]
        }
    );
}

#[test]
fn diff_is_by_value_not_identity() {
    let mut tracker = ChangeTracker::new();
    let mut instance = order(1, Some(1), 10);
    tracker.snapshot(&instance);

    // Overwrite with an equal value: no change.
    instance.set("total", Value::Uint(10));

    assert!(tracker.diff(&instance).is_empty());
}

#[test]
fn attribute_set_to_null_diffs_against_missing() {
    let mut tracker = ChangeTracker::new();
    let mut instance = order(1, Some(1), 10);
    tracker.snapshot(&instance);

    // A newly appearing null attribute equals the missing baseline.
    instance.set("note", Value::Null);
    assert!(tracker.diff(&instance).is_empty());

    instance.set("note", Value::text("rush"));
    assert_eq!(
        tracker.diff(&instance),
        vec![("note".to_string(), Value::text("rush"))]
    );
}

#[test]
fn marked_new_classifies_as_insert() {
    let mut tracker = ChangeTracker::new();
    let instance = order(1, None, 10);
    tracker.mark_new(instance.id());

    assert_eq!(tracker.classify(&instance), ChangeKind::Insert);
}

#[test]
fn marked_deleted_classifies_as_delete() {
    let mut tracker = ChangeTracker::new();
    let instance = order(1, Some(1), 10);
    tracker.snapshot(&instance);
    tracker.mark_deleted(instance.id());

    assert_eq!(tracker.classify(&instance), ChangeKind::Delete);
}

#[test]
fn delete_before_first_flush_cancels_the_insert() {
    let mut tracker = ChangeTracker::new();
    let instance = order(1, None, 10);
    tracker.mark_new(instance.id());
    tracker.mark_deleted(instance.id());

    assert_eq!(tracker.classify(&instance), ChangeKind::Dropped);
}

#[test]
fn snapshot_resets_the_baseline_and_the_new_mark() {
    let mut tracker = ChangeTracker::new();
    let mut instance = order(1, None, 10);
    tracker.mark_new(instance.id());

    // Simulate a successful insert flush.
    instance.set_key(Value::Uint(1));
    tracker.snapshot(&instance);

    assert_eq!(tracker.classify(&instance), ChangeKind::Unchanged);

    instance.set("total", Value::Uint(11));
    assert!(matches!(
        tracker.classify(&instance),
        ChangeKind::Update { .. }
    ));
}

#[test]
fn forget_drops_all_state_for_one_instance() {
    let mut tracker = ChangeTracker::new();
    let instance = order(1, Some(1), 10);
    tracker.snapshot(&instance);
    tracker.mark_deleted(instance.id());

    tracker.forget(instance.id());

    assert!(tracker.snapshot_of(instance.id()).is_none());
    assert!(!tracker.is_marked_deleted(instance.id()));
    assert_eq!(tracker.classify(&instance), ChangeKind::Unchanged);
}

#[test]
fn clear_resets_everything() {
    let mut tracker = ChangeTracker::new();
    let a = order(1, Some(1), 10);
    let b = order(2, None, 20);
    tracker.snapshot(&a);
    tracker.mark_new(b.id());

    tracker.clear();

    assert!(tracker.snapshot_of(a.id()).is_none());
    assert!(!tracker.is_marked_new(b.id()));
}
