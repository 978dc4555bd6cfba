//! List-mutation hooks driven through wrapper nodes.

use std::rc::Rc;

use json_observe::{
    observe, DiffKind, ListMethod, ObserveError, ObservedNode, PathStep, ScopeManager,
};
use serde_json::{json, Value};

fn tree(value: Value) -> (ObservedNode, Rc<ScopeManager>) {
    let scope = Rc::new(ScopeManager::new());
    (observe(value, Rc::clone(&scope)), scope)
}

#[test]
fn test_push_pop_round_trip() {
    let (list, scope) = tree(json!([1]));

    assert_eq!(list.invoke(ListMethod::Push, vec![json!(2), json!(3)]).unwrap(), json!(3));
    assert_eq!(list.raw().unwrap(), json!([1, 2, 3]));
    assert_eq!(list.invoke(ListMethod::Pop, vec![]).unwrap(), json!(3));
    assert_eq!(list.raw().unwrap(), json!([1, 2]));

    scope.actions.undo().unwrap();
    assert_eq!(list.raw().unwrap(), json!([1, 2, 3]));
    scope.actions.undo().unwrap();
    assert_eq!(list.raw().unwrap(), json!([1]));
    scope.actions.redo().unwrap();
    scope.actions.redo().unwrap();
    assert_eq!(list.raw().unwrap(), json!([1, 2]));
}

#[test]
fn test_shift_unshift_round_trip() {
    let (list, scope) = tree(json!(["a", "b"]));

    assert_eq!(list.invoke(ListMethod::Shift, vec![]).unwrap(), json!("a"));
    assert_eq!(list.raw().unwrap(), json!(["b"]));
    assert_eq!(
        list.invoke(ListMethod::Unshift, vec![json!("x"), json!("y")]).unwrap(),
        json!(3)
    );
    assert_eq!(list.raw().unwrap(), json!(["x", "y", "b"]));

    scope.actions.undo().unwrap();
    scope.actions.undo().unwrap();
    assert_eq!(list.raw().unwrap(), json!(["a", "b"]));
}

#[test]
fn test_splice_round_trip() {
    let (list, scope) = tree(json!([1, 2, 3, 4]));

    let removed = list
        .invoke(ListMethod::Splice, vec![json!(1), json!(2), json!("x"), json!("y")])
        .unwrap();
    assert_eq!(removed, json!([2, 3]));
    assert_eq!(list.raw().unwrap(), json!([1, "x", "y", 4]));

    let (path, kind) = scope
        .actions
        .with_record(0, |record| (record.path.clone(), record.kind))
        .unwrap();
    assert_eq!(path, Vec::<PathStep>::new(), "splice records carry the array's path");
    assert_eq!(kind, DiffKind::Splice);

    scope.actions.undo().unwrap();
    assert_eq!(list.raw().unwrap(), json!([1, 2, 3, 4]));
    scope.actions.redo().unwrap();
    assert_eq!(list.raw().unwrap(), json!([1, "x", "y", 4]));
}

#[test]
fn test_nested_list_diff_resolves_by_path() {
    let (root, scope) = tree(json!({"rows": [[1], [2]]}));
    let rows = root.get("rows").unwrap().into_node().unwrap();
    let first = rows.get(0usize).unwrap().into_node().unwrap();

    first.invoke(ListMethod::Push, vec![json!(9)]).unwrap();
    assert_eq!(root.raw().unwrap(), json!({"rows": [[1, 9], [2]]}));

    let path = scope
        .actions
        .with_record(0, |record| record.path.clone())
        .unwrap();
    assert_eq!(path, vec![PathStep::from("rows"), PathStep::from(0usize)]);

    scope.actions.undo().unwrap();
    assert_eq!(root.raw().unwrap(), json!({"rows": [[1], [2]]}));
}

#[test]
fn test_shifting_mutations_dispose_index_children() {
    let (list, _scope) = tree(json!([{"id": 0}, {"id": 1}, {"id": 2}]));
    let c0 = list.get(0usize).unwrap().into_node().unwrap();
    let c1 = list.get(1usize).unwrap().into_node().unwrap();
    let c2 = list.get(2usize).unwrap().into_node().unwrap();

    // Removing index 1 invalidates that child and everything after it.
    list.invoke(ListMethod::Splice, vec![json!(1), json!(1)]).unwrap();
    assert!(c0.is_live(), "children before the splice point keep working");
    assert!(!c1.is_live());
    assert!(!c2.is_live());

    assert_eq!(c0.get("id").unwrap().into_value(), Some(json!(0)));
    let fresh = list.get(1usize).unwrap().into_node().unwrap();
    assert!(!fresh.same_as(&c2));
    assert_eq!(fresh.get("id").unwrap().into_value(), Some(json!(2)));
}

#[test]
fn test_push_keeps_existing_children() {
    let (list, _scope) = tree(json!([{"id": 0}]));
    let c0 = list.get(0usize).unwrap().into_node().unwrap();
    list.invoke(ListMethod::Push, vec![json!({"id": 1})]).unwrap();
    assert!(c0.is_live());
    assert!(c0.same_as(&list.get(0usize).unwrap().into_node().unwrap()));
}

#[test]
fn test_pop_disposes_only_last_child() {
    let (list, _scope) = tree(json!([{"id": 0}, {"id": 1}]));
    let c0 = list.get(0usize).unwrap().into_node().unwrap();
    let c1 = list.get(1usize).unwrap().into_node().unwrap();
    list.invoke(ListMethod::Pop, vec![]).unwrap();
    assert!(c0.is_live());
    assert!(!c1.is_live());
}

#[test]
fn test_empty_pop_and_shift_log_nothing() {
    let (list, scope) = tree(json!([]));
    assert_eq!(list.invoke(ListMethod::Pop, vec![]).unwrap(), Value::Null);
    assert_eq!(list.invoke(ListMethod::Shift, vec![]).unwrap(), Value::Null);
    assert!(scope.actions.is_empty());
}

#[test]
fn test_hook_boundary_errors() {
    let (obj, _scope) = tree(json!({"a": 1}));
    assert_eq!(
        obj.invoke(ListMethod::Splice, vec![json!(0)]).unwrap_err(),
        ObserveError::NotList
    );

    let (list, scope) = tree(json!([1]));
    assert!(matches!(
        list.invoke(ListMethod::Splice, vec![json!(-1)]).unwrap_err(),
        ObserveError::InvalidArgument(_)
    ));
    assert_eq!(list.raw().unwrap(), json!([1]));
    assert!(scope.actions.is_empty());
}

#[test]
fn test_hook_names_resolve_on_every_list() {
    let (root, _scope) = tree(json!({"items": []}));
    let items = root.get("items").unwrap().into_node().unwrap();
    for method in ListMethod::ALL {
        assert_eq!(items.get(method.name()).unwrap().hook(), Some(method));
    }
    // Generic lookup still works for everything else.
    assert_eq!(items.get("length").unwrap().into_value(), Some(Value::Null));
}
