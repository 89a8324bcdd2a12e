//! Operations: the unit of replication.
//!
//! An [`Operation`] names a target node with a [`Cursor`], carries a
//! [`Mutation`] to perform there, and lists the operations that causally
//! precede it. Operations are immutable once built; the engine only reads them.
//!
//! # Usage
//!
//! ```
//! use replidoc::op::{Cursor, Mutation, Operation};
//!
//! // insert {"title": "milk"} under todos[0]
//! let op = Operation::new(
//!     "1@alice",
//!     Cursor::root().key("todos").index(0),
//!     Mutation::insert("title", "milk"),
//! );
//!
//! // a later write that has seen the first one
//! let edit = Operation::new(
//!     "2@alice",
//!     Cursor::root().key("todos").index(0).key("title"),
//!     Mutation::assign_here("eggs"),
//! )
//! .with_deps(["1@alice"]);
//!
//! assert!(edit.depends_on(op.id()));
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Value;

pub mod cursor;
pub mod errors;
pub mod id;

pub use cursor::{Cursor, CursorElement};
pub use errors::CursorError;
pub use id::OpId;

/// What a mutation does at its target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    /// Add a child (or a register entry) without touching existing content
    Insert,
    /// Clear the target's descendants, then insert
    Assign,
    /// Clear the target's descendants
    Delete,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::Insert => write!(f, "insert"),
            MutationKind::Assign => write!(f, "assign"),
            MutationKind::Delete => write!(f, "delete"),
        }
    }
}

/// Where the mutation's value goes relative to the target node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MutationKey {
    /// Write into the target's own register
    #[default]
    Absent,
    /// Create a named child of the target
    Named(String),
    /// Create an indexed child of the target
    Indexed(usize),
}

impl MutationKey {
    /// Returns true for [`MutationKey::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, MutationKey::Absent)
    }
}

impl From<&str> for MutationKey {
    fn from(key: &str) -> Self {
        MutationKey::Named(key.to_string())
    }
}

impl From<String> for MutationKey {
    fn from(key: String) -> Self {
        MutationKey::Named(key)
    }
}

impl From<usize> for MutationKey {
    fn from(index: usize) -> Self {
        MutationKey::Indexed(index)
    }
}

impl std::fmt::Display for MutationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKey::Absent => write!(f, "<register>"),
            MutationKey::Named(key) => write!(f, "{key}"),
            MutationKey::Indexed(index) => write!(f, "[{index}]"),
        }
    }
}

/// The change an operation makes at its target node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub kind: MutationKind,
    #[serde(default)]
    pub key: MutationKey,
    #[serde(default = "null_value")]
    pub value: Value,
}

fn null_value() -> Value {
    Value::Null
}

impl Mutation {
    /// Creates a mutation from its parts.
    pub fn new(kind: MutationKind, key: impl Into<MutationKey>, value: impl Into<Value>) -> Self {
        Self {
            kind,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Insert `value` as a new child of the target under `key`.
    pub fn insert(key: impl Into<MutationKey>, value: impl Into<Value>) -> Self {
        Self::new(MutationKind::Insert, key, value)
    }

    /// Insert `value` into the target's own register.
    pub fn insert_here(value: impl Into<Value>) -> Self {
        Self::new(MutationKind::Insert, MutationKey::Absent, value)
    }

    /// Replace the target's content with a new child under `key`.
    pub fn assign(key: impl Into<MutationKey>, value: impl Into<Value>) -> Self {
        Self::new(MutationKind::Assign, key, value)
    }

    /// Replace the target's content with a register value.
    pub fn assign_here(value: impl Into<Value>) -> Self {
        Self::new(MutationKind::Assign, MutationKey::Absent, value)
    }

    /// Remove everything below the target.
    pub fn delete() -> Self {
        Self::new(MutationKind::Delete, MutationKey::Absent, Value::Null)
    }

    /// Checks the mutation is well formed on its own.
    ///
    /// The check never looks at a document, so a mutation is either valid
    /// on every replica or on none. A delete has no insertion step and must
    /// carry neither a key nor a value.
    pub fn validate(&self) -> Result<(), String> {
        if self.kind == MutationKind::Delete {
            if !self.key.is_absent() {
                return Err(format!("delete carries key {}", self.key));
            }
            if !self.value.is_null() {
                return Err(format!("delete carries value {}", self.value));
            }
        }
        Ok(())
    }
}

/// A replicated operation.
///
/// The `id` is assigned by a [`CausalClock`](crate::clock::CausalClock) and is
/// unique across all replicas. Every id in `deps` must be applied before this
/// operation may be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    id: OpId,
    #[serde(default)]
    deps: BTreeSet<OpId>,
    #[serde(default)]
    cursor: Cursor,
    mutation: Mutation,
}

impl Operation {
    /// Creates an operation with no dependencies.
    pub fn new(id: impl Into<OpId>, cursor: Cursor, mutation: Mutation) -> Self {
        Self {
            id: id.into(),
            deps: BTreeSet::new(),
            cursor,
            mutation,
        }
    }

    /// Returns this operation with `deps` added to its dependency set.
    pub fn with_deps<I, D>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<OpId>,
    {
        self.deps.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn id(&self) -> &OpId {
        &self.id
    }

    pub fn deps(&self) -> &BTreeSet<OpId> {
        &self.deps
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    /// Returns true if `id` is one of this operation's declared dependencies.
    pub fn depends_on(&self, id: &OpId) -> bool {
        self.deps.contains(id)
    }

    /// Dependencies not satisfied by `is_applied`, in id order.
    pub fn missing_deps<F>(&self, is_applied: F) -> Vec<OpId>
    where
        F: Fn(&OpId) -> bool,
    {
        self.deps
            .iter()
            .filter(|dep| !is_applied(dep))
            .cloned()
            .collect()
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} at '{}' key {}",
            self.id, self.mutation.kind, self.cursor, self.mutation.key
        )
    }
}
