use replidoc::{Mutation, NodeKey, Value, cursor};

use crate::helpers::*;

#[test]
fn test_auto_vivification_creates_map_and_list_nodes() {
    let mut doc = replica("r1");
    deliver_all(
        &mut doc,
        &[op("1@r2", cursor!["a", 0usize], Mutation::insert_here("leaf"), &[])],
    );

    let a = doc.node_at(&cursor!["a"]).expect("map node created");
    assert_eq!(a.key(), Some(&NodeKey::Named("a".to_string())));
    assert_eq!(a.list_children().len(), 1);

    let leaf = doc.node_at(&cursor!["a", 0usize]).expect("list node created");
    assert_eq!(leaf.key(), Some(&NodeKey::Indexed(0)));

    assert_dep(&doc, &cursor!["a"], "1@r2");
    assert_dep(&doc, &cursor!["a", 0usize], "1@r2");
}

#[test]
fn test_traversal_records_every_operation_on_shared_prefix() {
    let mut doc = replica("r1");
    deliver_all(
        &mut doc,
        &[
            op("1@r2", cursor!["a", "b"], Mutation::insert_here(1), &[]),
            op("1@r3", cursor!["a", "c"], Mutation::insert_here(2), &[]),
        ],
    );

    assert_dep(&doc, &cursor!["a"], "1@r2");
    assert_dep(&doc, &cursor!["a"], "1@r3");
    assert_dep(&doc, &cursor!["a", "b"], "1@r2");
    assert!(!doc.node_at(&cursor!["a", "b"]).unwrap().has_dep(&"1@r3".into()));
    assert_eq!(child_names(&doc, &cursor!["a"]), vec!["b", "c"]);
}

#[test]
fn test_traversal_reuses_existing_nodes() {
    let mut doc = replica("r1");
    deliver_all(
        &mut doc,
        &[
            op("1@r2", cursor!["a"], Mutation::insert("b", 1), &[]),
            op("2@r2", cursor!["a", "b"], Mutation::insert_here(2), &["1@r2"]),
        ],
    );

    // walking through "b" keeps the value written by the first operation
    assert_eq!(doc.node_at(&cursor!["a"]).unwrap().child_count(), 1);
    assert_eq!(register_values(&doc, &cursor!["a", "b"]).len(), 2);
}

#[test]
fn test_traversal_past_list_end_keeps_node_at_its_index() {
    let mut doc = replica("r1");
    deliver_all(
        &mut doc,
        &[
            op("1@r2", cursor!["l"], Mutation::insert(0usize, "x"), &[]),
            op("2@r2", cursor!["l", 5usize], Mutation::insert_here("y"), &["1@r2"]),
        ],
    );

    let list = doc.node_at(&cursor!["l"]).unwrap();
    assert_eq!(list.list_children().len(), 6);
    let reached = doc.node_at(&cursor!["l", 5usize]).unwrap();
    assert_eq!(reached.key(), Some(&NodeKey::Indexed(5)));
    assert!(reached.has_dep(&"2@r2".into()));
    // the gap is filled with empty nodes
    assert!(list.child_at(3).unwrap().is_empty());
}

#[test]
fn test_concurrent_writes_past_list_end_share_a_register() {
    let mut doc = replica("r1");
    deliver_all(
        &mut doc,
        &[
            op("1@r1", cursor!["l", 3usize], Mutation::insert_here("a"), &[]),
            op("1@r2", cursor!["l", 3usize], Mutation::insert_here("b"), &[]),
        ],
    );

    assert_eq!(doc.node_at(&cursor!["l"]).unwrap().list_children().len(), 4);
    assert_eq!(
        register_values(&doc, &cursor!["l", 3usize]),
        vec![Value::from("a"), Value::from("b")]
    );
}

#[test]
fn test_root_cursor_targets_root() {
    let mut doc = replica("r1");
    deliver_all(
        &mut doc,
        &[op("1@r2", cursor![], Mutation::insert("k", "v"), &[])],
    );

    assert_eq!(child_names(&doc, &cursor![]), vec!["k"]);
    assert_dep(&doc, &cursor!["k"], "1@r2");
    // the root is the mutation target here, so it records the operation too
    assert!(doc.root().has_dep(&"1@r2".into()));
}
