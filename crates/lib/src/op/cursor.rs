//! Cursor types for addressing nodes in a replicated document.
//!
//! A [`Cursor`] is the path from the document root to a node, made of
//! [`CursorElement`]s. Map keys descend into named children, list keys descend
//! into indexed children. The empty cursor names the root.
//!
//! # Usage
//!
//! ```rust
//! use replidoc::op::Cursor;
//! use replidoc::cursor;
//! use std::str::FromStr;
//!
//! // Build incrementally
//! let built = Cursor::root().key("todos").index(0).key("title");
//!
//! // Or with the macro
//! let from_macro = cursor!["todos", 0usize, "title"];
//!
//! // Or parse the display form
//! let parsed = Cursor::from_str("todos[0].title")?;
//!
//! assert_eq!(built, from_macro);
//! assert_eq!(built, parsed);
//! assert_eq!(built.to_string(), "todos[0].title");
//! # Ok::<(), replidoc::op::CursorError>(())
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::errors::CursorError;

/// One step of a [`Cursor`].
///
/// The variant is the kind tag: traversal dispatches on it directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorElement {
    /// Descend into the child stored under a string key (object semantics).
    MapKey(String),
    /// Descend into the child stored at a list position (array semantics).
    ListKey(usize),
}

impl CursorElement {
    /// Returns the map key if this is a map element.
    pub fn as_map_key(&self) -> Option<&str> {
        match self {
            CursorElement::MapKey(key) => Some(key),
            CursorElement::ListKey(_) => None,
        }
    }

    /// Returns the list index if this is a list element.
    pub fn as_list_index(&self) -> Option<usize> {
        match self {
            CursorElement::ListKey(index) => Some(*index),
            CursorElement::MapKey(_) => None,
        }
    }

    /// Returns true for map elements.
    pub fn is_map_key(&self) -> bool {
        matches!(self, CursorElement::MapKey(_))
    }

    /// Returns true for list elements.
    pub fn is_list_key(&self) -> bool {
        matches!(self, CursorElement::ListKey(_))
    }
}

impl From<&str> for CursorElement {
    fn from(key: &str) -> Self {
        CursorElement::MapKey(key.to_string())
    }
}

impl From<String> for CursorElement {
    fn from(key: String) -> Self {
        CursorElement::MapKey(key)
    }
}

impl From<&String> for CursorElement {
    fn from(key: &String) -> Self {
        CursorElement::MapKey(key.clone())
    }
}

impl From<usize> for CursorElement {
    fn from(index: usize) -> Self {
        CursorElement::ListKey(index)
    }
}

impl fmt::Display for CursorElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorElement::MapKey(key) => write!(f, "{key}"),
            CursorElement::ListKey(index) => write!(f, "[{index}]"),
        }
    }
}

/// An immutable path from the document root to a node.
///
/// Cursors have no identity beyond their content: two cursors with the same
/// elements are equal. Builder methods consume and return `Self`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor {
    path: Vec<CursorElement>,
}

impl Cursor {
    /// The empty cursor, naming the root node.
    pub fn root() -> Self {
        Self { path: Vec::new() }
    }

    /// Creates a cursor from a sequence of elements.
    pub fn new(path: impl IntoIterator<Item = CursorElement>) -> Self {
        Self {
            path: path.into_iter().collect(),
        }
    }

    /// Appends a map key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.path.push(CursorElement::MapKey(key.into()));
        self
    }

    /// Appends a list index.
    pub fn index(mut self, index: usize) -> Self {
        self.path.push(CursorElement::ListKey(index));
        self
    }

    /// Appends an arbitrary element.
    pub fn push(mut self, element: impl Into<CursorElement>) -> Self {
        self.path.push(element.into());
        self
    }

    /// Returns a new cursor with `other`'s elements appended to this one.
    pub fn join(&self, other: &Cursor) -> Self {
        let mut path = self.path.clone();
        path.extend(other.path.iter().cloned());
        Self { path }
    }

    /// The elements of this cursor, root first.
    pub fn elements(&self) -> &[CursorElement] {
        &self.path
    }

    /// Iterates over the elements, root first.
    pub fn iter(&self) -> std::slice::Iter<'_, CursorElement> {
        self.path.iter()
    }

    /// Number of elements (depth of the addressed node).
    pub fn len(&self) -> usize {
        self.path.len()
    }

    /// Returns true if this cursor addresses the root.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// The final element, or `None` for the root.
    pub fn last(&self) -> Option<&CursorElement> {
        self.path.last()
    }

    /// The cursor of the parent node, or `None` for the root.
    pub fn parent(&self) -> Option<Cursor> {
        let (_, init) = self.path.split_last()?;
        Some(Self {
            path: init.to_vec(),
        })
    }

    /// Returns true if `self` is a (non-strict) prefix of `other`.
    pub fn is_prefix_of(&self, other: &Cursor) -> bool {
        other.path.starts_with(&self.path)
    }
}

impl<'a> IntoIterator for &'a Cursor {
    type Item = &'a CursorElement;
    type IntoIter = std::slice::Iter<'a, CursorElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.path.iter()
    }
}

impl FromIterator<CursorElement> for Cursor {
    fn from_iter<T: IntoIterator<Item = CursorElement>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for Cursor {
    /// Renders map keys joined by `.` and list indices as `[n]`, e.g. `a[0].b`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 && element.is_map_key() {
                write!(f, ".")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

impl FromStr for Cursor {
    type Err = CursorError;

    /// Parses the [`Display`](fmt::Display) form back into a cursor.
    ///
    /// Map keys in this form cannot contain `.`, `[` or `]`; use the builder
    /// for such keys. The empty string is the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cursor = Cursor::root();
        let mut key = String::new();
        let mut chars = s.char_indices();
        // set after '.', cleared once a key char or index follows
        let mut expect_key = false;
        // set after ']', a key must be introduced by '.'
        let mut after_index = false;

        while let Some((position, c)) = chars.next() {
            match c {
                '.' => {
                    if !key.is_empty() {
                        cursor = cursor.key(std::mem::take(&mut key));
                    } else if cursor.is_root() || expect_key {
                        return Err(CursorError::EmptyKey { position });
                    }
                    expect_key = true;
                    after_index = false;
                }
                '[' => {
                    if !key.is_empty() {
                        cursor = cursor.key(std::mem::take(&mut key));
                    } else if expect_key {
                        return Err(CursorError::EmptyKey { position });
                    }
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some((_, ']')) => break,
                            Some((_, d)) => digits.push(d),
                            None => return Err(CursorError::UnterminatedIndex { position }),
                        }
                    }
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| CursorError::InvalidIndex { index: digits })?;
                    cursor = cursor.index(index);
                    expect_key = false;
                    after_index = true;
                }
                ']' => return Err(CursorError::UnexpectedChar { ch: c, position }),
                _ => {
                    if after_index {
                        return Err(CursorError::UnexpectedChar { ch: c, position });
                    }
                    key.push(c);
                    expect_key = false;
                }
            }
        }

        if !key.is_empty() {
            cursor = cursor.key(key);
        } else if expect_key {
            return Err(CursorError::EmptyKey { position: s.len() });
        }
        Ok(cursor)
    }
}

/// Builds a [`Cursor`] from a list of elements.
///
/// String-like arguments become map keys, `usize` arguments become list
/// indices. With no arguments the root cursor is returned.
///
/// ```rust
/// use replidoc::cursor;
/// use replidoc::op::{Cursor, CursorElement};
///
/// let c = cursor!["users", 3usize, "name"];
/// assert_eq!(c.elements()[1], CursorElement::ListKey(3));
/// assert!(cursor![].is_root());
/// ```
#[macro_export]
macro_rules! cursor {
    () => {
        $crate::op::Cursor::root()
    };
    ($($element:expr),+ $(,)?) => {
        $crate::op::Cursor::new([
            $($crate::op::CursorElement::from($element)),+
        ])
    };
}
