//! Error types for document operations.
//!
//! Only hard failures live here. An operation waiting on missing dependencies
//! is not an error: it is reported as [`ApplyOutcome::Buffered`](super::ApplyOutcome::Buffered).
//! Redelivery of an applied operation is not an error either.

use thiserror::Error;

use crate::op::OpId;

/// Structured error types for document operations.
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// The mutation cannot be applied at its target.
    ///
    /// Nodes created while walking the operation's cursor stay attached.
    #[error("Invalid mutation in operation {op_id}: {reason}")]
    InvalidMutation { op_id: OpId, reason: String },
}

impl DocumentError {
    /// Check if this error is an invalid mutation
    pub fn is_invalid_mutation(&self) -> bool {
        matches!(self, DocumentError::InvalidMutation { .. })
    }

    /// The id of the operation that failed
    pub fn op_id(&self) -> &OpId {
        match self {
            DocumentError::InvalidMutation { op_id, .. } => op_id,
        }
    }
}

// Conversion from DocumentError to the main Error type
impl From<DocumentError> for crate::Error {
    fn from(err: DocumentError) -> Self {
        crate::Error::Document(err)
    }
}
