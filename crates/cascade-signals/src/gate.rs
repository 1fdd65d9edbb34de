//! Quoting inhibitors.

use cascade_core::{Compute, ComputeCtx, Graph, GraphResult, NodeId, NodeSpec, Status};

/// Inhibits quoting while the market is too wide to trust.
///
/// The value is the current spread. Status goes `Invalid` when the spread
/// exceeds the configured limit (downstream quoting logic is pruned for the
/// round) and `Error` when the book is crossed.
pub struct SpreadGate {
    bid: NodeId,
    ask: NodeId,
    limit: f64,
}

impl Compute for SpreadGate {
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
        let bid = ctx.held_value(self.bid);
        let ask = ctx.held_value(self.ask);
        let spread = ask - bid;
        ctx.set_value(spread);
        if spread < 0.0 {
            ctx.set_status(Status::Error);
        } else if spread > self.limit {
            ctx.set_status(Status::Invalid);
        }
    }
}

impl NodeSpec for SpreadGate {
    type Args = (NodeId, NodeId, u32);
    const TYPE_NAME: &'static str = "SpreadGate";

    fn build(graph: &mut Graph, args: &Self::Args) -> GraphResult<NodeId> {
        let (bid, ask, limit_mils) = *args;
        let id = graph.new_value_node(
            Self::TYPE_NAME,
            Box::new(SpreadGate {
                bid,
                ask,
                limit: f64::from(limit_mils) / 1000.0,
            }),
        );
        graph.set_clock(id, &[bid, ask])?;
        Ok(id)
    }
}
