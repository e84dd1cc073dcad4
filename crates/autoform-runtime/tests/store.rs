mod common;

use std::cell::RefCell;
use std::rc::Rc;

use autoform_runtime::store::ValueStore;
use autoform_schema::FieldPath;
use serde_json::{json, Value};

use common::index;

fn settings() -> Value {
    json!({
        "title": "Settings",
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": {"type": "string", "default": "pump"},
            "count": {"type": "integer", "minimum": 0, "maximum": 10},
            "note": {"type": ["string", "null"]},
            "limits": {
                "type": "object",
                "properties": {"low": {"type": "number", "default": 0.5}}
            }
        }
    })
}

#[test]
fn starts_from_the_schema_default() {
    let store = ValueStore::new(index(settings()));
    assert_eq!(
        *store.get(),
        json!({"name": "pump", "count": 0, "note": null, "limits": {"low": 0.5}})
    );
    assert_eq!(store.get_default(), *store.get());
    assert_eq!(
        store.default_at(&FieldPath::from("limits.low")).expect("default"),
        json!(0.5)
    );
}

#[test]
fn set_fills_omitted_fields_and_notifies_once() {
    let mut store = ValueStore::new(index(settings()));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store.subscribe(move |change| sink.borrow_mut().push(change.clone()));

    store.set(&json!({"name": "fan", "count": 3})).expect("set");

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].previous["name"], json!("pump"));
    assert_eq!(
        seen[0].current,
        json!({"name": "fan", "count": 3, "note": null, "limits": {"low": 0.5}})
    );
    assert!(seen[0].path.is_root());
}

#[test]
fn rejected_values_leave_the_store_untouched() {
    let mut store = ValueStore::new(index(settings()));
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    store.subscribe(move |_| *counter.borrow_mut() += 1);
    let before = store.get().clone();

    let err = store.set(&json!({"name": "fan", "count": 11})).unwrap_err();
    assert_eq!(err.path.to_string(), "count");
    let err = store
        .set_at(&FieldPath::from("limits.low"), json!("high"))
        .unwrap_err();
    assert_eq!(err.path.to_string(), "limits.low");

    assert_eq!(*store.get(), before);
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn set_at_updates_one_nested_field() {
    let mut store = ValueStore::new(index(settings()));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store.subscribe(move |change| sink.borrow_mut().push(change.path.to_string()));

    store
        .set_at(&FieldPath::from("limits.low"), json!(2))
        .expect("set_at");

    assert_eq!(store.get_at(&FieldPath::from("limits.low")), Some(&json!(2)));
    assert_eq!(*seen.borrow(), ["limits.low"]);
}

#[test]
fn listeners_run_in_registration_order() {
    let mut store = ValueStore::new(index(settings()));
    let order = Rc::new(RefCell::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let order = Rc::clone(&order);
        store.subscribe(move |_| order.borrow_mut().push(label));
    }
    let removed = {
        let order = Rc::clone(&order);
        store.subscribe(move |_| order.borrow_mut().push("removed"))
    };
    assert!(store.unsubscribe(removed));

    store.set(&json!({"name": "fan"})).expect("set");

    assert_eq!(*order.borrow(), ["first", "second", "third"]);
}

#[test]
fn with_value_checks_the_initial_value() {
    let schema = index(settings());
    assert!(ValueStore::with_value(schema.clone(), &json!({"name": "x"})).is_ok());
    let err = ValueStore::with_value(schema, &json!({"name": 3})).unwrap_err();
    assert_eq!(err.to_string(), "name: expected string, found number");
}
