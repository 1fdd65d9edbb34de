//! Compute behaviors and the per-round compute context.
//!
//! A node's recomputation logic lives in a [`Compute`] implementation owned
//! by the node. During a firing round the graph invokes
//! [`Compute::compute`] with a [`ComputeCtx`] scoped to the node, through
//! which the body reads upstream values and publishes its own result and
//! status.

use std::any::Any;

use crate::graph::Graph;
use crate::node::{KindState, NodeId, NodeKind, Status};

/// Upcast helper so behaviors can be recovered as their concrete type
/// (e.g. to stage external input before a round). Blanket-implemented.
pub trait AsAny: Any {
    /// Borrow as a type-erased reference.
    fn as_any(&self) -> &dyn Any;
    /// Borrow as a type-erased mutable reference.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Recomputation body of a node.
///
/// The body runs only on rounds where the node's clock fired and every
/// dependency parent is valid. It is responsible for setting the node's
/// status: a value body normally publishes through
/// [`ComputeCtx::set_value`] (which sets `Ok`), a clock body decides
/// whether to [`ComputeCtx::emit`] its trigger. Degradation is reported by
/// setting `Invalid`/`Error`/`Fatal`, never by panicking.
///
/// Bodies must not block and must not mutate graph topology.
pub trait Compute: AsAny + Send {
    /// Recompute this node for the current round.
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>);
}

/// Access to the graph scoped to one node's compute step.
pub struct ComputeCtx<'g> {
    pub(crate) graph: &'g mut Graph,
    pub(crate) node: NodeId,
}

impl ComputeCtx<'_> {
    /// Handle of the node being computed.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Sequence number of the current external event.
    pub fn event_id(&self) -> u64 {
        self.graph.event_id()
    }

    /// The source driving the current round.
    pub fn source(&self) -> Option<NodeId> {
        self.graph.current_source()
    }

    /// Fresh value of an upstream node (debug-asserts ticked and valid).
    pub fn value(&self, id: NodeId) -> f64 {
        self.graph.node(id).value()
    }

    /// Last computed value of an upstream node (debug-asserts valid).
    pub fn held_value(&self, id: NodeId) -> f64 {
        self.graph.node(id).held_value()
    }

    /// Whether an upstream node's clock fired this round.
    pub fn ticked(&self, id: NodeId) -> bool {
        self.graph.node(id).ticked()
    }

    /// Whether an upstream node's status is `Ok`.
    pub fn valid(&self, id: NodeId) -> bool {
        self.graph.node(id).valid()
    }

    /// Status of an upstream node.
    pub fn status(&self, id: NodeId) -> Status {
        self.graph.node(id).status()
    }

    /// Publish this node's value for the round and mark it `Ok`.
    pub fn set_value(&mut self, value: f64) {
        let node = self.graph.node_mut(self.node);
        debug_assert_eq!(node.kind(), NodeKind::Value, "set_value on a non-value node");
        if let KindState::Value { value: slot } = &mut node.state {
            *slot = value;
        }
        node.status = Status::Ok;
    }

    /// Set this node's status directly.
    pub fn set_status(&mut self, status: Status) {
        self.graph.node_mut(self.node).status = status;
    }

    /// Emit this clock node's trigger for the round and mark it `Ok`.
    pub fn emit(&mut self) {
        let node = self.graph.node_mut(self.node);
        debug_assert!(node.kind().is_clock(), "emit on a non-clock node");
        node.ticked = true;
        node.status = Status::Ok;
    }
}
