//! Per-symbol quote feeds: the bridge from external market events into the
//! graph.
//!
//! A feed is one source node (the event clock for that symbol) plus two
//! staged-input value nodes for the bid and ask. The delivery layer stages
//! a fresh [`QuoteBook`] and fires the source; everything downstream of the
//! symbol recomputes in one synchronous round.

use cascade_core::{Compute, ComputeCtx, Graph, GraphResult, NodeId, NodeSpec, Status};
use tracing::trace;

// =============================================================================
// QUOTE BOOK
// =============================================================================

/// Top-of-book snapshot for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuoteBook {
    /// Best bid, if any.
    pub bid: Option<f64>,
    /// Best ask, if any.
    pub ask: Option<f64>,
}

impl QuoteBook {
    /// Two-sided book.
    pub fn new(bid: f64, ask: f64) -> Self {
        Self {
            bid: Some(bid),
            ask: Some(ask),
        }
    }

    /// Midpoint of a two-sided book.
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) => Some(0.5 * (b + a)),
            _ => None,
        }
    }

    /// Ask minus bid of a two-sided book.
    pub fn spread(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) => Some(a - b),
            _ => None,
        }
    }

    /// Whether the book is crossed (ask below bid).
    pub fn is_crossed(&self) -> bool {
        matches!(self.spread(), Some(s) if s < 0.0)
    }
}

// =============================================================================
// STAGED INPUT
// =============================================================================

/// Value body fed from outside the graph.
///
/// The delivery layer stages the next observation before firing the
/// symbol's source; the compute step publishes whatever is staged. An empty
/// side goes `Invalid`, which prunes that branch for the round.
#[derive(Debug, Default)]
pub struct StagedInput {
    staged: Option<f64>,
}

impl StagedInput {
    /// Stage the next observation (or its absence).
    pub fn stage(&mut self, value: Option<f64>) {
        self.staged = value;
    }
}

impl Compute for StagedInput {
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
        match self.staged {
            Some(value) => ctx.set_value(value),
            None => ctx.set_status(Status::Invalid),
        }
    }
}

// =============================================================================
// FEED SPECS
// =============================================================================

/// Source node for one symbol's market events.
pub struct TickSource;

impl NodeSpec for TickSource {
    type Args = String;
    const TYPE_NAME: &'static str = "TickSource";

    fn build(graph: &mut Graph, symbol: &Self::Args) -> GraphResult<NodeId> {
        let id = graph.new_source(Self::TYPE_NAME);
        graph.set_name(id, format!("TickSource({symbol})"))?;
        Ok(id)
    }
}

/// Best-bid input node for one symbol.
pub struct BidQuote;

impl NodeSpec for BidQuote {
    type Args = String;
    const TYPE_NAME: &'static str = "BidQuote";

    fn build(graph: &mut Graph, symbol: &Self::Args) -> GraphResult<NodeId> {
        let source = graph.add::<TickSource>(symbol.clone())?;
        let id = graph.new_value_node(Self::TYPE_NAME, Box::new(StagedInput::default()));
        graph.set_clock(id, &[source])?;
        graph.set_name(id, format!("BidQuote({symbol})"))?;
        Ok(id)
    }
}

/// Best-ask input node for one symbol.
pub struct AskQuote;

impl NodeSpec for AskQuote {
    type Args = String;
    const TYPE_NAME: &'static str = "AskQuote";

    fn build(graph: &mut Graph, symbol: &Self::Args) -> GraphResult<NodeId> {
        let source = graph.add::<TickSource>(symbol.clone())?;
        let id = graph.new_value_node(Self::TYPE_NAME, Box::new(StagedInput::default()));
        graph.set_clock(id, &[source])?;
        graph.set_name(id, format!("AskQuote({symbol})"))?;
        Ok(id)
    }
}

// =============================================================================
// QUOTE FEED
// =============================================================================

/// Handle to one symbol's feed nodes.
///
/// Construction is memoized per symbol, so every consumer of a symbol
/// shares one source and one pair of input nodes.
#[derive(Debug, Clone)]
pub struct QuoteFeed {
    /// The symbol this feed carries.
    pub symbol: String,
    /// The symbol's event source.
    pub source: NodeId,
    /// Best-bid input node.
    pub bid: NodeId,
    /// Best-ask input node.
    pub ask: NodeId,
}

impl QuoteFeed {
    /// Look up or create the feed nodes for `symbol`.
    pub fn attach(graph: &mut Graph, symbol: &str) -> GraphResult<Self> {
        let source = graph.add::<TickSource>(symbol.to_string())?;
        let bid = graph.add::<BidQuote>(symbol.to_string())?;
        let ask = graph.add::<AskQuote>(symbol.to_string())?;
        Ok(Self {
            symbol: symbol.to_string(),
            source,
            bid,
            ask,
        })
    }

    /// Stage a book snapshot and run one firing round for this symbol.
    pub fn publish(&self, graph: &mut Graph, book: QuoteBook) {
        if let Some(staged) = graph.behavior_mut::<StagedInput>(self.bid) {
            staged.stage(book.bid);
        }
        if let Some(staged) = graph.behavior_mut::<StagedInput>(self.ask) {
            staged.stage(book.ask);
        }
        trace!(symbol = %self.symbol, bid = ?book.bid, ask = ?book.ask, "publishing book");
        graph.fire(self.source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_accessors() {
        let book = QuoteBook::new(99.0, 101.0);
        assert_eq!(book.mid(), Some(100.0));
        assert_eq!(book.spread(), Some(2.0));
        assert!(!book.is_crossed());

        let crossed = QuoteBook::new(101.0, 99.0);
        assert!(crossed.is_crossed());

        let one_sided = QuoteBook {
            bid: Some(99.0),
            ask: None,
        };
        assert_eq!(one_sided.mid(), None);
        assert_eq!(one_sided.spread(), None);
        assert!(!one_sided.is_crossed());
    }

    #[test]
    fn test_feed_is_shared_per_symbol() {
        let mut g = Graph::new();
        let f1 = QuoteFeed::attach(&mut g, "BTEC:US2Y").unwrap();
        let f2 = QuoteFeed::attach(&mut g, "BTEC:US2Y").unwrap();
        let other = QuoteFeed::attach(&mut g, "BTEC:US5Y").unwrap();

        assert_eq!(f1.source, f2.source);
        assert_eq!(f1.bid, f2.bid);
        assert_eq!(f1.ask, f2.ask);
        assert_ne!(f1.source, other.source);
        // Two symbols: three nodes each.
        assert_eq!(g.node_count(), 6);
    }

    #[test]
    fn test_publish_drives_the_inputs() {
        let mut g = Graph::new();
        let feed = QuoteFeed::attach(&mut g, "NASDAQ:AAPL").unwrap();
        g.validate().unwrap();

        feed.publish(&mut g, QuoteBook::new(99.5, 100.5));
        assert_eq!(g.node(feed.bid).held_value(), 99.5);
        assert_eq!(g.node(feed.ask).held_value(), 100.5);

        // A one-sided book invalidates only the missing side.
        feed.publish(
            &mut g,
            QuoteBook {
                bid: Some(99.75),
                ask: None,
            },
        );
        assert_eq!(g.node(feed.bid).held_value(), 99.75);
        assert_eq!(g.node(feed.ask).status(), Status::Invalid);
    }
}
