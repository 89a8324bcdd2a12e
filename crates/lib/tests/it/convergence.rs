//! Multi-replica convergence tests
//!
//! Each test delivers the same operations to several replicas in different
//! orders and compares the resulting trees.

use std::{
    sync::{Arc, Mutex},
    thread,
};

use replidoc::{Document, Mutation, Operation, Value, cursor};

use crate::helpers::*;

/// Every ordering of `items`.
fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

#[test]
fn test_concurrent_inserts_commute() {
    let x = op("1@r1", cursor![], Mutation::insert("x", 1), &[]);
    let y = op("1@r2", cursor![], Mutation::insert("y", 2), &[]);

    let mut first = replica("r3");
    let mut second = replica("r4");
    deliver_all(&mut first, &[x.clone(), y.clone()]);
    deliver_all(&mut second, &[y, x]);

    assert_same_tree(first.root(), second.root());
    assert_eq!(child_names(&first, &cursor![]), vec!["x", "y"]);
}

#[test]
fn test_every_delivery_order_converges() {
    let ops = vec![
        op("1@r1", cursor!["doc"], Mutation::insert("title", "draft"), &[]),
        op("1@r2", cursor!["doc", "tags"], Mutation::insert(0usize, "crdt"), &[]),
        op("2@r1", cursor!["doc", "title"], Mutation::insert_here("final"), &["1@r1"]),
        op("2@r2", cursor!["doc", "tags"], Mutation::insert(1usize, "rust"), &["1@r2"]),
        op("1@r3", cursor!["doc", "title"], Mutation::insert_here("other"), &["1@r1"]),
    ];

    let mut reference = replica("ref");
    deliver_all(&mut reference, &ops);

    for (n, order) in permutations(&ops).into_iter().enumerate() {
        let mut doc = replica(&format!("p{n}"));
        deliver_all(&mut doc, &order);
        assert!(doc.pending().is_empty(), "order {n} left pending operations");
        assert_eq!(doc.applied().len(), ops.len());
        assert_same_tree(doc.root(), reference.root());
    }
}

#[test]
fn test_locally_authored_histories_converge() {
    let mut alice = replica("alice");
    let mut bob = replica("bob");

    let mut from_alice = vec![
        alice.apply_local(cursor!["list"], Mutation::insert(0usize, "a1")).unwrap(),
        alice.apply_local(cursor!["meta"], Mutation::insert("owner", "alice")).unwrap(),
    ];
    let mut from_bob = vec![
        bob.apply_local(cursor!["counter"], Mutation::insert_here(1)).unwrap(),
        bob.apply_local(cursor!["counter"], Mutation::assign_here(2)).unwrap(),
    ];

    // exchange in reverse so every operation is buffered first
    from_alice.reverse();
    from_bob.reverse();
    deliver_all(&mut bob, &from_alice);
    deliver_all(&mut alice, &from_bob);

    assert!(alice.pending().is_empty());
    assert!(bob.pending().is_empty());
    assert_same_tree(alice.root(), bob.root());
}

#[test]
fn test_delete_ordered_after_insert_converges() {
    let insert = op("1@r1", cursor!["a"], Mutation::insert("b", 1), &[]);
    let delete = op("1@r2", cursor!["a"], Mutation::delete(), &["1@r1"]);

    let mut first = replica("r3");
    let mut second = replica("r4");
    deliver_all(&mut first, &[insert.clone(), delete.clone()]);
    deliver_all(&mut second, &[delete, insert]);

    assert_same_tree(first.root(), second.root());
    assert!(first.node_at(&cursor!["a", "b"]).is_none());
}

#[test]
fn test_concurrent_delete_and_insert_depend_on_arrival_order() {
    // neither operation has seen the other: the delete only clears what
    // is present when it is applied
    let insert = op("1@r1", cursor!["a"], Mutation::insert("b", 1), &[]);
    let delete = op("1@r2", cursor!["a"], Mutation::delete(), &[]);

    let mut first = replica("r3");
    let mut second = replica("r4");
    deliver_all(&mut first, &[insert.clone(), delete.clone()]);
    deliver_all(&mut second, &[delete, insert]);

    assert!(first.node_at(&cursor!["a", "b"]).is_none());
    assert!(second.node_at(&cursor!["a", "b"]).is_some());
}

#[test]
fn test_list_insert_after_concurrent_delete_never_blocks_dependents() {
    let first = op("1@r1", cursor!["l"], Mutation::insert(0usize, "a"), &[]);
    let second = op("2@r1", cursor!["l"], Mutation::insert(1usize, "b"), &["1@r1"]);
    let delete = op("1@r2", cursor!["l"], Mutation::delete(), &["1@r1"]);
    let dependent = op("3@r1", cursor!["x"], Mutation::insert_here(true), &["2@r1"]);

    let mut early = replica("p");
    let mut late = replica("q");
    deliver_all(
        &mut early,
        &[first.clone(), second.clone(), delete.clone(), dependent.clone()],
    );
    // the list is already empty when the second insert arrives here
    deliver_all(&mut late, &[first, delete, second, dependent]);

    for doc in [&early, &late] {
        assert_eq!(doc.applied().len(), 4, "{doc}");
        assert!(doc.pending().is_empty(), "{doc}");
        assert!(doc.rejected().is_empty(), "{doc}");
        assert_eq!(register_values(doc, &cursor!["x"]), vec![Value::from(true)]);
    }
}

#[test]
fn test_shared_document_behind_mutex() {
    fn chain(replica: &str, len: u32) -> Vec<Operation> {
        (1..=len)
            .map(|i| {
                let deps: Vec<String> = if i > 1 {
                    vec![format!("{}@{replica}", i - 1)]
                } else {
                    Vec::new()
                };
                Operation::new(
                    format!("{i}@{replica}"),
                    cursor![replica],
                    Mutation::insert_here(i),
                )
                .with_deps(deps)
            })
            .collect()
    }

    let chains: Vec<Vec<Operation>> = (0..4).map(|k| chain(&format!("w{k}"), 8)).collect();
    let shared = Arc::new(Mutex::new(Document::new("hub")));

    let handles: Vec<_> = chains
        .iter()
        .cloned()
        .enumerate()
        .map(|(k, mut ops)| {
            // odd writers deliver newest first to exercise the buffer under the lock
            if k % 2 == 1 {
                ops.reverse();
            }
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for op in ops {
                    shared.lock().unwrap().apply_remote(op).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut sequential = replica("seq");
    for ops in &chains {
        deliver_all(&mut sequential, ops);
    }

    let hub = shared.lock().unwrap();
    assert!(hub.pending().is_empty());
    assert_eq!(hub.applied().len(), 32);
    assert_same_tree(hub.root(), sequential.root());
}
