//! Causal clock abstraction
//!
//! This module provides a [`CausalClock`] trait that abstracts over operation
//! id generation, and [`LamportClock`], the default implementation.
//!
//! The engine treats ids as opaque: it only asks the clock for fresh ids when
//! authoring local operations and reports every applied id back through
//! [`CausalClock::observe`] so later ids sort after everything already seen.
//!
//! # Example
//!
//! ```
//! use replidoc::clock::{CausalClock, LamportClock};
//!
//! let mut clock = LamportClock::new("alice");
//! let first = clock.next_id()?;
//! assert_eq!(first, "1@alice");
//!
//! clock.observe(&"41@bob".into());
//! assert_eq!(clock.next_id()?, "42@alice");
//! # Ok::<(), replidoc::clock::ClockError>(())
//! ```

use std::fmt::Debug;

use thiserror::Error;

use crate::op::OpId;

/// Errors raised by a [`CausalClock`].
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClockError {
    /// The clock cannot produce another id for this replica
    #[error("Clock for replica {replica} has no ids left")]
    Exhausted { replica: String },
}

impl ClockError {
    /// Check if this error means the id space is used up
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ClockError::Exhausted { .. })
    }
}

impl From<ClockError> for crate::Error {
    fn from(err: ClockError) -> Self {
        crate::Error::Clock(err)
    }
}

/// A generator of replica-scoped, causally ordered operation ids.
pub trait CausalClock: Send + Sync + Debug {
    /// The replica identifier this clock was seeded with.
    fn replica(&self) -> &str;

    /// Returns a fresh id, unique across all replicas.
    ///
    /// Fails rather than reuse an id once the clock runs out.
    fn next_id(&mut self) -> Result<OpId, ClockError>;

    /// Records that an operation with `id` has been applied locally.
    fn observe(&mut self, id: &OpId);
}

/// Lamport clock producing ids of the form `<counter>@<replica>`.
///
/// Uniqueness comes from the replica id; the counter only has to move forward.
/// Observing a remote id pushes the counter past that id's counter, so ids
/// generated afterwards are greater in Lamport order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LamportClock {
    replica: String,
    counter: u64,
}

impl LamportClock {
    /// Creates a clock for `replica` starting at zero.
    pub fn new(replica: impl Into<String>) -> Self {
        Self {
            replica: replica.into(),
            counter: 0,
        }
    }

    /// Creates a clock seeded with a random v4 UUID replica id.
    pub fn random() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// The counter of the last id generated or observed.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Splits an id produced by a `LamportClock` into counter and replica.
    ///
    /// Returns `None` for ids in any other format.
    pub fn parse(id: &OpId) -> Option<(u64, &str)> {
        let (counter, replica) = id.as_str().split_once('@')?;
        Some((counter.parse().ok()?, replica))
    }
}

impl CausalClock for LamportClock {
    fn replica(&self) -> &str {
        &self.replica
    }

    fn next_id(&mut self) -> Result<OpId, ClockError> {
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| ClockError::Exhausted {
                replica: self.replica.clone(),
            })?;
        Ok(OpId::new(format!("{}@{}", self.counter, self.replica)))
    }

    fn observe(&mut self, id: &OpId) {
        // foreign id formats carry no ordering information
        if let Some((counter, _)) = Self::parse(id) {
            self.counter = self.counter.max(counter);
        }
    }
}
