//! Nodes of the computation graph.
//!
//! A [`Node`] is one computation/state unit in a [`crate::graph::Graph`].
//! Every node carries two independent edge sets:
//!
//! - *Dependency edges* (`parents`/`children`): "must be valid before".
//!   Used for validity gating: a node is not recomputed while any parent
//!   is not OK.
//! - *Trigger edges* (`clocks`/`callbacks`): "recompute when this fires".
//!   Used to derive each source's firing order.
//!
//! A node commonly appears as both a dependency-predecessor and a
//! trigger-predecessor of the same descendant; the two relations are
//! tracked and consumed independently.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::compute::Compute;

/// Edge adjacency list. Stays inline for the typical fan-in/fan-out.
pub(crate) type EdgeList = SmallVec<[NodeId; 4]>;

// =============================================================================
// IDENTITY
// =============================================================================

/// Identifier of the graph a node handle belongs to.
///
/// Drawn from a process-wide counter so handles from distinct graphs never
/// compare equal, and memo keys containing upstream handles differ across
/// graph instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphId(u32);

impl GraphId {
    /// Allocate the next graph identifier.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable handle to a node inside its owning graph.
///
/// The index is assigned monotonically at creation and never reused; the
/// graph component ties the handle to the arena that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub(crate) graph: GraphId,
    pub(crate) index: u32,
}

impl NodeId {
    /// Position of the node in its graph's construction sequence.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The graph this handle belongs to.
    pub fn graph_id(&self) -> GraphId {
        self.graph
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Computation status of a node.
///
/// `Ok` is the only status in which a node's value may be consumed.
/// Transitions follow a uniform rule: when a node's clock fires and all
/// parents are `Ok`, the compute body runs and sets the status (normally
/// `Ok`); when a parent is unusable, only an `Ok` node is demoted to
/// `Invalid`. A node still in `Init` stays `Init` so "never yet computed"
/// is not masked by "became invalid".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Never computed since construction.
    Init,
    /// Last computation succeeded; the value is usable.
    Ok,
    /// Upstream state made the last round unusable; recovers on a later
    /// round in which the parents are valid again.
    Invalid,
    /// The compute body flagged an unrecoverable domain condition.
    Error,
    /// The compute body flagged a condition that poisons the session.
    Fatal,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Init => "INIT",
            Status::Ok => "OK",
            Status::Invalid => "INVALID",
            Status::Error => "ERROR",
            Status::Fatal => "FATAL",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// KIND
// =============================================================================

/// Closed set of node variants.
///
/// Control flow dispatches on this tag; there is no run-time type
/// identification anywhere in the firing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Holds one scalar value, recomputed when its single clock fires.
    Value,
    /// Produces a boolean trigger signal each round; propagates firing to
    /// descendants.
    Clock,
    /// Root clock representing an external event; owns the firing order of
    /// its trigger-closure.
    Source,
}

impl NodeKind {
    /// Whether this kind participates in the clock relation as a trigger.
    pub fn is_clock(&self) -> bool {
        matches!(self, NodeKind::Clock | NodeKind::Source)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Value => "value",
            NodeKind::Clock => "clock",
            NodeKind::Source => "source",
        };
        write!(f, "{}", s)
    }
}

/// Kind-specific node state.
pub(crate) enum KindState {
    Value {
        value: f64,
    },
    Clock,
    Source {
        /// Precomputed linearization of the trigger-closure, excluding the
        /// source itself. Rebuilt on every structural change that reaches
        /// this source.
        compute_order: Vec<NodeId>,
    },
}

// =============================================================================
// NODE
// =============================================================================

/// One computation/state unit, owned by its graph.
///
/// Nodes are created only through the graph's construction entry points and
/// destroyed only when the owning graph is dropped. Edge lists are
/// insertion-ordered and duplicate-free; the graph maintains the symmetry
/// invariant (p in n.parents exactly when n in p.children, and likewise
/// for clocks/callbacks) on every mutation.
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) state: KindState,
    pub(crate) status: Status,
    pub(crate) ticked: bool,
    pub(crate) parents: EdgeList,
    pub(crate) children: EdgeList,
    pub(crate) clocks: EdgeList,
    pub(crate) callbacks: EdgeList,
    pub(crate) type_name: &'static str,
    pub(crate) name: Option<String>,
    pub(crate) compute: Option<Box<dyn Compute>>,
    // Lifetime counters, consumed by the audit/dump diagnostics.
    pub(crate) fired_count: u64,
    pub(crate) ticked_count: u64,
    pub(crate) computed_count: u64,
    pub(crate) emit_count: u64,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        state: KindState,
        type_name: &'static str,
        compute: Option<Box<dyn Compute>>,
    ) -> Self {
        Self {
            id,
            state,
            status: Status::Init,
            ticked: false,
            parents: EdgeList::new(),
            children: EdgeList::new(),
            clocks: EdgeList::new(),
            callbacks: EdgeList::new(),
            type_name,
            name: None,
            compute,
            fired_count: 0,
            ticked_count: 0,
            computed_count: 0,
            emit_count: 0,
        }
    }

    /// Stable handle of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Kind tag of this node.
    pub fn kind(&self) -> NodeKind {
        match self.state {
            KindState::Value { .. } => NodeKind::Value,
            KindState::Clock => NodeKind::Clock,
            KindState::Source { .. } => NodeKind::Source,
        }
    }

    /// Current computation status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// True iff the status is `Ok`.
    pub fn valid(&self) -> bool {
        self.status == Status::Ok
    }

    /// True iff this node's clock fired in the current round.
    ///
    /// Independent of value correctness: a node can be ticked and invalid.
    pub fn ticked(&self) -> bool {
        self.ticked
    }

    /// The fresh value computed this round.
    ///
    /// Reading a value that was not computed this round, or is not
    /// currently valid, is a programmer error; the guards are compiled out
    /// of optimized builds. Use [`Node::held_value`] when a stale value is
    /// acceptable.
    pub fn value(&self) -> f64 {
        debug_assert!(
            self.ticked,
            "{}: value is not current; use held_value if a stale read is intended",
            self.display_name()
        );
        self.held_value()
    }

    /// The last computed value, regardless of this round's ticked flag.
    pub fn held_value(&self) -> f64 {
        debug_assert!(
            self.valid(),
            "{}: reading a value while status is {}",
            self.display_name(),
            self.status
        );
        match self.state {
            KindState::Value { value } => value,
            _ => {
                debug_assert!(false, "{}: not a value node", self.display_name());
                f64::NAN
            }
        }
    }

    /// Dependency predecessors ("must be valid before this node").
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Dependency successors.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Trigger predecessors ("recompute when one of these fires").
    pub fn clocks(&self) -> &[NodeId] {
        &self.clocks
    }

    /// Trigger successors.
    pub fn callbacks(&self) -> &[NodeId] {
        &self.callbacks
    }

    /// Registered type name (the memo/registry key).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Explicit name if set, else a name derived from type and identity.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}{}", self.type_name, self.id),
        }
    }

    /// Whether an explicit name has been set.
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Rounds in which this node's fire step ran.
    pub fn fired_count(&self) -> u64 {
        self.fired_count
    }

    /// Rounds in which this node's clock had fired.
    pub fn ticked_count(&self) -> u64 {
        self.ticked_count
    }

    /// Rounds in which the compute body actually ran.
    pub fn computed_count(&self) -> u64 {
        self.computed_count
    }

    /// Rounds in which a clock node emitted its own trigger.
    pub fn emit_count(&self) -> u64 {
        self.emit_count
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("name", &self.display_name())
            .field("status", &self.status)
            .field("ticked", &self.ticked)
            .finish()
    }
}
