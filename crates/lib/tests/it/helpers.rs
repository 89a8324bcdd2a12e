use replidoc::{
    ApplyOutcome, Cursor, Document, Mutation, Node, OpId, Operation, Value,
};

// ==========================
// OPERATION FACTORIES
// ==========================

/// Builds an operation with the given id, cursor, mutation and deps.
pub fn op(id: &str, cursor: Cursor, mutation: Mutation, deps: &[&str]) -> Operation {
    Operation::new(id, cursor, mutation).with_deps(deps.iter().copied())
}

/// Creates a fresh replica with the given id.
pub fn replica(id: &str) -> Document {
    Document::new(id)
}

/// Delivers every operation in order, asserting none of them errors.
pub fn deliver_all(doc: &mut Document, ops: &[Operation]) -> Vec<ApplyOutcome> {
    ops.iter()
        .map(|op| {
            doc.apply_remote(op.clone())
                .unwrap_or_else(|e| panic!("delivering {op} failed: {e}"))
        })
        .collect()
}

// ==========================
// TREE ASSERTIONS
// ==========================

/// Register values of the node at `cursor`, in writer-id order.
pub fn register_values(doc: &Document, cursor: &Cursor) -> Vec<Value> {
    doc.node_at(cursor)
        .unwrap_or_else(|| panic!("no node at '{cursor}'"))
        .register()
        .values()
        .cloned()
        .collect()
}

/// Names of the map children of the node at `cursor`.
pub fn child_names(doc: &Document, cursor: &Cursor) -> Vec<String> {
    doc.node_at(cursor)
        .unwrap_or_else(|| panic!("no node at '{cursor}'"))
        .map_children()
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Asserts two nodes are identical, printing both trees on failure.
pub fn assert_same_tree(left: &Node, right: &Node) {
    assert_eq!(
        left,
        right,
        "trees diverged:\nleft:  {}\nright: {}",
        render(left),
        render(right)
    );
}

/// Compact rendering of a subtree for failure messages.
pub fn render(node: &Node) -> String {
    let mut out = String::from("{");
    for (writer, value) in node.register() {
        out.push_str(&format!("{writer}={value} "));
    }
    for (name, child) in node.map_children() {
        out.push_str(&format!("{name}:{} ", render(child)));
    }
    for (i, child) in node.list_children().iter().enumerate() {
        out.push_str(&format!("[{i}]:{} ", render(child)));
    }
    out.push('}');
    out
}

/// Asserts `id` touched the node at `cursor`.
pub fn assert_dep(doc: &Document, cursor: &Cursor, id: &str) {
    let node = doc
        .node_at(cursor)
        .unwrap_or_else(|| panic!("no node at '{cursor}'"));
    assert!(
        node.has_dep(&OpId::from(id)),
        "node at '{cursor}' does not record {id}: {:?}",
        node.deps()
    );
}
