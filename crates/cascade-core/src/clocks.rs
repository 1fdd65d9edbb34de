//! Clock combinators.

use crate::compute::{Compute, ComputeCtx};
use crate::error::GraphResult;
use crate::graph::{Graph, NodeSpec};
use crate::node::NodeId;

/// Clock node that re-emits when any of its upstream clocks fired.
///
/// [`Graph::set_clock`] materializes one of these when a value node is
/// clocked on several distinct triggers, so the value still has exactly one
/// clock. Joins are memoized on the sorted trigger set: the same
/// combination requested from different call sites collapses to one node.
pub struct AnyClock;

impl Compute for AnyClock {
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
        // Only invoked on rounds where one of the upstream clocks ticked.
        ctx.emit();
    }
}

impl NodeSpec for AnyClock {
    type Args = Vec<NodeId>;
    const TYPE_NAME: &'static str = "AnyClock";

    fn build(graph: &mut Graph, args: &Self::Args) -> GraphResult<NodeId> {
        let id = graph.new_clock_node(Self::TYPE_NAME, Box::new(AnyClock));
        graph.set_clock(id, args)?;
        Ok(id)
    }
}

/// Join a set of clock-kind triggers into one clock node.
pub fn join_clocks(graph: &mut Graph, triggers: &[NodeId]) -> GraphResult<NodeId> {
    let mut key: Vec<NodeId> = triggers.to_vec();
    key.sort_unstable();
    key.dedup();
    graph.add::<AnyClock>(key)
}
