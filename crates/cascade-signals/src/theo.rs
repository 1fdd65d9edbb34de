//! Theoretical price signals.

use cascade_core::{Compute, ComputeCtx, Graph, GraphResult, NodeId, NodeSpec, Status};

use crate::feed::QuoteFeed;

// =============================================================================
// MIDPOINT
// =============================================================================

/// Midpoint of a symbol's bid and ask.
pub struct Midpoint {
    bid: NodeId,
    ask: NodeId,
}

impl Midpoint {
    /// Midpoint over the (shared) feed of `symbol`.
    pub fn for_symbol(graph: &mut Graph, symbol: &str) -> GraphResult<NodeId> {
        let feed = QuoteFeed::attach(graph, symbol)?;
        graph.add::<Midpoint>((feed.bid, feed.ask))
    }
}

impl Compute for Midpoint {
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
        let bid = ctx.held_value(self.bid);
        let ask = ctx.held_value(self.ask);
        ctx.set_value(0.5 * (bid + ask));
    }
}

impl NodeSpec for Midpoint {
    type Args = (NodeId, NodeId);
    const TYPE_NAME: &'static str = "Midpoint";

    fn build(graph: &mut Graph, args: &Self::Args) -> GraphResult<NodeId> {
        let (bid, ask) = *args;
        let id = graph.new_value_node(Self::TYPE_NAME, Box::new(Midpoint { bid, ask }));
        graph.set_clock(id, &[bid, ask])?;
        Ok(id)
    }
}

// =============================================================================
// EMA
// =============================================================================

/// Event-time exponential moving average of another value node.
///
/// The half-life is measured in events of the input's clock: after that
/// many recomputations, an input step has decayed to half weight. Seeds on
/// the first observation.
pub struct Ema {
    input: NodeId,
    alpha: f64,
    state: Option<f64>,
}

impl Compute for Ema {
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
        let x = ctx.value(self.input);
        let v = match self.state {
            None => x,
            Some(prev) => prev + self.alpha * (x - prev),
        };
        self.state = Some(v);
        ctx.set_value(v);
    }
}

impl NodeSpec for Ema {
    type Args = (NodeId, u32);
    const TYPE_NAME: &'static str = "Ema";

    fn build(graph: &mut Graph, args: &Self::Args) -> GraphResult<NodeId> {
        let (input, half_life) = *args;
        let half_life = half_life.max(1);
        let alpha = 1.0 - 0.5f64.powf(1.0 / f64::from(half_life));
        let id = graph.new_value_node(
            Self::TYPE_NAME,
            Box::new(Ema {
                input,
                alpha,
                state: None,
            }),
        );
        graph.set_clock(id, &[input])?;
        Ok(id)
    }
}

// =============================================================================
// COMPOSITE THEO
// =============================================================================

/// Weighted combination of several theo nodes, possibly clocked on several
/// sources.
///
/// Recomputes when any leg's clock fires, reading the held value of each
/// leg, so a quiet leg contributes its last good price. Weights are fixed
/// per-mille at construction; the result is the weighted average.
pub struct CompositeTheo {
    legs: Vec<(NodeId, f64)>,
}

impl Compute for CompositeTheo {
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
        let mut total = 0.0;
        let mut weight = 0.0;
        for &(leg, w) in &self.legs {
            total += w * ctx.held_value(leg);
            weight += w;
        }
        if weight == 0.0 {
            ctx.set_status(Status::Invalid);
            return;
        }
        ctx.set_value(total / weight);
    }
}

impl NodeSpec for CompositeTheo {
    type Args = Vec<(NodeId, i32)>;
    const TYPE_NAME: &'static str = "CompositeTheo";

    fn build(graph: &mut Graph, args: &Self::Args) -> GraphResult<NodeId> {
        let legs: Vec<(NodeId, f64)> = args
            .iter()
            .map(|&(leg, mils)| (leg, f64::from(mils) / 1000.0))
            .collect();
        let inputs: Vec<NodeId> = legs.iter().map(|&(leg, _)| leg).collect();
        let id = graph.new_value_node(Self::TYPE_NAME, Box::new(CompositeTheo { legs }));
        graph.set_clock(id, &inputs)?;
        Ok(id)
    }
}
