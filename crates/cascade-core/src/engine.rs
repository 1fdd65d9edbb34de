//! Event delivery into the graph.
//!
//! The graph itself is single-writer: a firing round needs `&mut Graph` and
//! runs start to finish with no interleaving. Deployments typically have
//! several producer threads (market data, order gateway, timers) delivering
//! events into one computation graph; [`EventLoop`] is the admission gate
//! that serializes them, so exactly one firing round executes at a time.
//!
//! The gate is advisory in the sense of the design: it is acquired here, at
//! the delivery boundary, and never re-acquired inside the firing path.
//! Inside a round, exclusivity is the `&mut` borrow.

use parking_lot::{Mutex, MutexGuard};

use crate::graph::Graph;
use crate::node::NodeId;

/// Serializes event delivery from multiple producer threads into
/// single-threaded firing rounds.
pub struct EventLoop {
    graph: Mutex<Graph>,
}

impl EventLoop {
    /// Wrap a fully constructed (and validated) graph.
    pub fn new(graph: Graph) -> Self {
        Self {
            graph: Mutex::new(graph),
        }
    }

    /// Deliver one external event: admit past the gate, then run the
    /// source's firing round to completion.
    pub fn deliver(&self, source: NodeId) {
        let mut graph = self.graph.lock();
        graph.fire(source);
    }

    /// Exclusive access to the graph between rounds (staging external
    /// input, reading results, diagnostics).
    pub fn graph(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock()
    }

    /// Tear down the gate and recover the graph.
    pub fn into_graph(self) -> Graph {
        self.graph.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_delivery_serializes_rounds() {
        let mut g = Graph::new();
        let src = g.new_source("Tick");
        let event_loop = EventLoop::new(g);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        event_loop.deliver(src);
                    }
                });
            }
        });

        let graph = event_loop.graph();
        assert_eq!(graph.event_id(), 1000);
        assert_eq!(graph.node(src).fired_count(), 1000);
    }
}
