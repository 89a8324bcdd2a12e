//! Error types for the cursor and operation model.

use thiserror::Error;

/// Errors raised while parsing a [`Cursor`](super::Cursor) from its string form.
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CursorError {
    /// A map key was expected but nothing was found
    #[error("Empty map key at position {position}")]
    EmptyKey { position: usize },

    /// A `[` was not closed
    #[error("Unterminated list index starting at position {position}")]
    UnterminatedIndex { position: usize },

    /// The contents of `[...]` are not a non-negative integer
    #[error("Invalid list index '{index}'")]
    InvalidIndex { index: String },

    /// A character that is not allowed at this position
    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
}

impl CursorError {
    /// Check if this error is about a list index
    pub fn is_index_error(&self) -> bool {
        matches!(
            self,
            CursorError::UnterminatedIndex { .. } | CursorError::InvalidIndex { .. }
        )
    }

    /// Byte position of the error in the input, when known
    pub fn position(&self) -> Option<usize> {
        match self {
            CursorError::EmptyKey { position }
            | CursorError::UnterminatedIndex { position }
            | CursorError::UnexpectedChar { position, .. } => Some(*position),
            CursorError::InvalidIndex { .. } => None,
        }
    }
}

impl From<CursorError> for crate::Error {
    fn from(err: CursorError) -> Self {
        crate::Error::Cursor(err)
    }
}
