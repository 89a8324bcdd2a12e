//!
//! replidoc: a replicated JSON-shaped document built as an operation-based CRDT.
//! This library provides the replica engine that applies operations to a shared tree.
//!
//! ## Core Concepts
//!
//! * **Operations (`op::Operation`)**: The unit of replication. An operation names a target node with a
//!   cursor, carries an insert/assign/delete mutation, and lists the operations it causally depends on.
//! * **Cursors (`op::Cursor`)**: Paths of map keys and list indices from the document root to a node.
//! * **Nodes (`node::Node`)**: The document tree. Each node holds named children, indexed children and a
//!   multi-value register that keeps every concurrent write.
//! * **Documents (`document::Document`)**: One replica. It gates operations on their dependencies,
//!   buffers the ones that arrive early, ignores redeliveries and drains the buffer as dependencies arrive.
//! * **Clocks (`clock::CausalClock`)**: Generators of replica-scoped operation ids.
//!
//! Replicas that have applied the same set of operations hold the same tree, whatever the delivery order.

pub mod clock;
pub mod document;
pub mod node;
pub mod op;
pub mod value;

pub use clock::{CausalClock, ClockError, LamportClock};
pub use document::{ApplyOutcome, Document, DocumentConfig, DocumentError, RejectedOp};
pub use node::{Node, NodeKey};
pub use op::{Cursor, CursorElement, Mutation, MutationKey, MutationKind, OpId, Operation};
pub use value::Value;

/// Result type used throughout the replidoc library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the replidoc library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured document errors from the document module
    #[error(transparent)]
    Document(document::DocumentError),

    /// Cursor parsing errors from the op module
    #[error(transparent)]
    Cursor(op::CursorError),

    /// Value conversion errors from the value module
    #[error(transparent)]
    Value(value::ValueError),

    /// Id generation errors from the clock module
    #[error(transparent)]
    Clock(clock::ClockError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Document(_) => "document",
            Error::Cursor(_) => "op",
            Error::Value(_) => "value",
            Error::Clock(_) => "clock",
        }
    }

    /// Check if this error is document-related.
    pub fn is_document_error(&self) -> bool {
        matches!(self, Error::Document(_))
    }

    /// Check if this error is an invalid mutation.
    pub fn is_invalid_mutation(&self) -> bool {
        match self {
            Error::Document(document_err) => document_err.is_invalid_mutation(),
            _ => false,
        }
    }

    /// Check if this error comes from parsing a cursor.
    pub fn is_cursor_error(&self) -> bool {
        matches!(self, Error::Cursor(_))
    }

    /// Check if this error comes from the clock.
    pub fn is_clock_error(&self) -> bool {
        matches!(self, Error::Clock(_))
    }

    /// Check if this error is a value type mismatch.
    pub fn is_type_error(&self) -> bool {
        matches!(self, Error::Value(value::ValueError::TypeMismatch { .. }))
    }
}
