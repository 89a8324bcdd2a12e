//! The replicated document engine.
//!
//! A [`Document`] is one replica's copy of the shared tree. It applies
//! operations authored locally ([`Document::apply_local`]) and received from
//! other replicas ([`Document::apply_remote`]). Replicas that have applied the
//! same set of operations hold the same tree, whatever order the operations
//! arrived in, provided each operation's deps are accurate.
//!
//! # Application pipeline
//!
//! 1. An operation whose id was already applied is ignored.
//! 2. An operation with unapplied deps is buffered.
//! 3. Otherwise the cursor is walked from the root, creating missing nodes,
//!    and every node on the way records the operation id.
//! 4. The mutation is applied at the target and the id is recorded.
//! 5. The buffer is re-scanned until no buffered operation is ready.
//!
//! # Concurrency
//!
//! All mutating methods take `&mut self`: calls into one document are
//! serialized by construction. To share a document between threads, wrap it
//! in a `Mutex` and hold the lock for the whole call. Separate documents share
//! nothing and can run in parallel.
//!
//! # Usage
//!
//! ```
//! use replidoc::{Document, cursor};
//! use replidoc::op::Mutation;
//!
//! let mut alice = Document::new("alice");
//! let mut bob = Document::new("bob");
//!
//! let op = alice.apply_local(cursor!["todos"], Mutation::insert(0usize, "milk"))?;
//! bob.apply_remote(op)?;
//!
//! assert_eq!(alice.root(), bob.root());
//! # Ok::<(), replidoc::Error>(())
//! ```

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::{
    Result,
    clock::{CausalClock, LamportClock},
    node::Node,
    op::{Cursor, Mutation, MutationKind, OpId, Operation},
};

pub mod config;
pub mod errors;

pub use config::DocumentConfig;
pub use errors::DocumentError;

/// A buffered operation that failed when its dependencies were satisfied.
///
/// It is kept by the document (see [`Document::rejected`]) rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOp {
    pub operation: Operation,
    pub reason: String,
}

/// What [`Document::apply_remote`] did with an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The operation was already applied or is already buffered.
    Duplicate,
    /// Some dependencies are not applied yet; the operation waits in the buffer.
    Buffered { missing: Vec<OpId> },
    /// The operation was applied, followed by any buffered operations it
    /// unblocked.
    Applied {
        drained: Vec<OpId>,
        rejected: Vec<RejectedOp>,
    },
}

impl ApplyOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ApplyOutcome::Duplicate)
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, ApplyOutcome::Buffered { .. })
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }

    /// Ids of buffered operations applied as a consequence of this call.
    pub fn drained(&self) -> &[OpId] {
        match self {
            ApplyOutcome::Applied { drained, .. } => drained,
            _ => &[],
        }
    }
}

/// One replica of a replicated JSON-shaped document.
#[derive(Debug)]
pub struct Document {
    id: String,
    clock: Box<dyn CausalClock>,
    /// Applied ids in application order
    applied: Vec<OpId>,
    /// Same ids as `applied`, for membership checks
    applied_set: HashSet<OpId>,
    root: Node,
    /// Buffered operations in arrival order
    pending: Vec<Operation>,
    /// Ids of the operations in `pending`
    pending_ids: HashSet<OpId>,
    rejected: Vec<RejectedOp>,
    /// Last operation this replica authored
    frontier: Option<OpId>,
    config: DocumentConfig,
}

impl Document {
    /// Creates a replica identified by `id`, using a [`LamportClock`].
    ///
    /// The id must be unique among the replicas that exchange operations.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_clock(LamportClock::new(id))
    }

    /// Creates a replica with a random UUID identifier.
    pub fn new_random() -> Self {
        Self::with_clock(LamportClock::random())
    }

    /// Creates a replica driven by a custom clock; the replica id is the clock's.
    pub fn with_clock(clock: impl CausalClock + 'static) -> Self {
        Self {
            id: clock.replica().to_string(),
            clock: Box::new(clock),
            applied: Vec::new(),
            applied_set: HashSet::new(),
            root: Node::root(),
            pending: Vec::new(),
            pending_ids: HashSet::new(),
            rejected: Vec::new(),
            frontier: None,
            config: DocumentConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: DocumentConfig) -> Self {
        self.config = config;
        self
    }

    /// The replica identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn CausalClock {
        self.clock.as_ref()
    }

    /// The root of the document tree.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The node at `cursor`, if it exists. Never creates nodes.
    pub fn node_at(&self, cursor: &Cursor) -> Option<&Node> {
        self.root.get(cursor)
    }

    /// Applied operation ids, in application order.
    pub fn applied(&self) -> &[OpId] {
        &self.applied
    }

    pub fn is_applied(&self, id: &OpId) -> bool {
        self.applied_set.contains(id)
    }

    /// Operations waiting for their dependencies, in arrival order.
    pub fn pending(&self) -> &[Operation] {
        &self.pending
    }

    pub fn is_pending(&self, id: &OpId) -> bool {
        self.pending_ids.contains(id)
    }

    /// Buffered operations that failed once their dependencies arrived.
    pub fn rejected(&self) -> &[RejectedOp] {
        &self.rejected
    }

    /// The last operation id authored by this replica.
    pub fn frontier(&self) -> Option<&OpId> {
        self.frontier.as_ref()
    }

    /// Applies an operation received from another replica.
    ///
    /// Redelivered operations are ignored and operations with unapplied
    /// dependencies are buffered; neither is an error. After a successful
    /// apply, every buffered operation that became ready is applied too,
    /// cascading until nothing else is ready.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidMutation`] if `op` itself cannot be
    /// applied. Nodes created while walking its cursor stay in the tree.
    /// Failures of buffered operations during the drain are reported in
    /// the `rejected` field of [`ApplyOutcome::Applied`] instead.
    pub fn apply_remote(&mut self, op: Operation) -> Result<ApplyOutcome> {
        if self.is_applied(op.id()) || self.is_pending(op.id()) {
            debug!(op_id = %op.id(), replica = %self.id, "Ignoring duplicate operation");
            return Ok(ApplyOutcome::Duplicate);
        }

        let missing = op.missing_deps(|dep| self.is_applied(dep));
        if !missing.is_empty() {
            debug!(
                op_id = %op.id(),
                replica = %self.id,
                missing = missing.len(),
                "Buffering operation with unapplied dependencies"
            );
            self.pending_ids.insert(op.id().clone());
            self.pending.push(op);
            if self.pending.len() > self.config.pending_warn_threshold {
                warn!(
                    replica = %self.id,
                    pending = self.pending.len(),
                    threshold = self.config.pending_warn_threshold,
                    "Pending operation buffer above threshold"
                );
            }
            return Ok(ApplyOutcome::Buffered { missing });
        }

        self.apply_ready(&op)?;
        let (drained, rejected) = self.drain_pending();
        Ok(ApplyOutcome::Applied { drained, rejected })
    }

    /// Applies an operation whose dependencies are known to be satisfied.
    ///
    /// This is the path for self-authored operations. Dependencies are not
    /// checked. Applying an id that was already applied does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidMutation`] if the mutation cannot be
    /// applied at its target. Traversal side effects are not rolled back.
    pub fn apply_ready(&mut self, op: &Operation) -> Result<()> {
        if self.is_applied(op.id()) {
            return Ok(());
        }

        if self.config.record_root_deps {
            self.root.add_dep(op.id());
        }
        let (target, stats) = self.root.traverse_mut(op.cursor(), op.id());
        if let Err(err) = target.mutate(op) {
            warn!(
                op_id = %op.id(),
                replica = %self.id,
                created = stats.created,
                error = %err,
                "Mutation failed; traversal side effects remain"
            );
            return Err(err.into());
        }

        self.applied.push(op.id().clone());
        self.applied_set.insert(op.id().clone());
        self.clock.observe(op.id());

        debug!(
            op_id = %op.id(),
            replica = %self.id,
            cursor = %op.cursor(),
            kind = %op.mutation().kind,
            touched = stats.touched,
            created = stats.created,
            "Applied operation"
        );
        Ok(())
    }

    /// Authors an operation on this replica and applies it.
    ///
    /// The new operation depends on every operation that touched a node on
    /// `cursor`'s path, on everything below the target when the mutation
    /// clears it, and on the previous local operation. Returns the operation
    /// so it can be sent to other replicas.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidMutation`] if the mutation is
    /// malformed, and [`ClockError::Exhausted`](crate::clock::ClockError::Exhausted)
    /// if the clock has no ids left. In both cases the operation is not
    /// recorded and the frontier does not move.
    pub fn apply_local(&mut self, cursor: Cursor, mutation: Mutation) -> Result<Operation> {
        let clears = matches!(mutation.kind, MutationKind::Assign | MutationKind::Delete);
        let mut deps = self.path_deps(&cursor, clears);
        if let Some(previous) = &self.frontier {
            deps.insert(previous.clone());
        }

        let op = Operation::new(self.clock.next_id()?, cursor, mutation).with_deps(deps);
        self.apply_ready(&op)?;
        self.frontier = Some(op.id().clone());
        Ok(op)
    }

    /// Ids recorded on the existing nodes along `cursor`, and optionally on
    /// everything below its target.
    fn path_deps(&self, cursor: &Cursor, include_subtree: bool) -> BTreeSet<OpId> {
        let mut deps: BTreeSet<OpId> = self.root.deps().iter().cloned().collect();
        let mut current = Some(&self.root);
        for element in cursor {
            current = current.and_then(|node| node.step(element));
            match current {
                Some(node) => deps.extend(node.deps().iter().cloned()),
                None => break,
            }
        }
        if include_subtree {
            for node in current.iter().flat_map(|target| target.descendants()) {
                deps.extend(node.deps().iter().cloned());
            }
        }
        deps
    }

    /// Applies every buffered operation whose dependencies are now satisfied,
    /// repeating until a full scan finds nothing ready.
    fn drain_pending(&mut self) -> (Vec<OpId>, Vec<RejectedOp>) {
        let mut drained = Vec::new();
        let mut rejected = Vec::new();

        while let Some(position) = self
            .pending
            .iter()
            .position(|op| op.deps().iter().all(|dep| self.is_applied(dep)))
        {
            let op = self.pending.remove(position);
            self.pending_ids.remove(op.id());
            if self.is_applied(op.id()) {
                continue;
            }
            match self.apply_ready(&op) {
                Ok(()) => drained.push(op.id().clone()),
                Err(err) => {
                    warn!(op_id = %op.id(), replica = %self.id, error = %err, "Rejected buffered operation");
                    let entry = RejectedOp {
                        operation: op,
                        reason: err.to_string(),
                    };
                    self.rejected.push(entry.clone());
                    rejected.push(entry);
                }
            }
        }

        if !drained.is_empty() {
            debug!(
                replica = %self.id,
                drained = drained.len(),
                still_pending = self.pending.len(),
                "Drained pending operations"
            );
        }
        (drained, rejected)
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Document {} (applied: {}, pending: {}, rejected: {})",
            self.id,
            self.applied.len(),
            self.pending.len(),
            self.rejected.len()
        )
    }
}
