//! Topological sequencing over the graph's edge sets.
//!
//! Depth-first traversal used both to derive a source's firing order and to
//! answer closure queries for diagnostics. All walks use an explicit work
//! stack (no recursion, no depth limit) and a visited-set guard, so they
//! terminate on cyclic drafts as well; correctness gating against cycles is
//! the separate three-color check in [`crate::graph::Graph::validate`].

use std::collections::HashSet;

use smallvec::SmallVec;

use crate::graph::Graph;
use crate::node::NodeId;

/// Which forward edge set a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Follow {
    /// Trigger edges only (clock to callback).
    Triggers,
    /// Trigger edges plus dependency edges (parent to child).
    TriggersAndChildren,
}

enum Step {
    Enter(NodeId),
    Exit(NodeId),
}

fn forward_successors(graph: &Graph, id: NodeId, follow: Follow, out: &mut SmallVec<[NodeId; 8]>) {
    let node = graph.node(id);
    out.extend(node.callbacks().iter().copied());
    if follow == Follow::TriggersAndChildren {
        for &child in node.children() {
            if !out.contains(&child) {
                out.push(child);
            }
        }
    }
}

/// Depth-first post-order over the selected forward edges from `root`.
///
/// Every node appears after all of its traversed successors. Cycle-safe:
/// already-visited nodes are skipped rather than re-entered.
pub fn post_order(graph: &Graph, root: NodeId, follow: Follow) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![Step::Enter(root)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(id) => {
                if !visited.insert(id) {
                    continue;
                }
                stack.push(Step::Exit(id));
                let mut successors = SmallVec::new();
                forward_successors(graph, id, follow, &mut successors);
                for &succ in successors.iter() {
                    if !visited.contains(&succ) {
                        stack.push(Step::Enter(succ));
                    }
                }
            }
            Step::Exit(id) => out.push(id),
        }
    }
    out
}

/// Linearization of the nodes reachable from `root` in which every node
/// follows all of its traversed predecessors.
///
/// With `include` set, only members of that subset are emitted (used to
/// restrict a firing order to a source's trigger-closure); the relative
/// order among emitted nodes is unchanged. Nodes unreachable from `root`
/// never appear.
pub fn topological_order(
    graph: &Graph,
    root: NodeId,
    follow: Follow,
    include: Option<&HashSet<NodeId>>,
) -> Vec<NodeId> {
    let mut order: Vec<NodeId> = post_order(graph, root, follow)
        .into_iter()
        .filter(|id| include.map_or(true, |set| set.contains(id)))
        .collect();
    order.reverse();
    order
}

/// Every node reachable from `root` through trigger edges, `root` included.
pub fn trigger_closure(graph: &Graph, root: NodeId) -> HashSet<NodeId> {
    let mut closure: HashSet<NodeId> = HashSet::new();
    let mut work = vec![root];
    while let Some(id) = work.pop() {
        if !closure.insert(id) {
            continue;
        }
        work.extend(graph.node(id).callbacks().iter().copied());
    }
    closure
}

/// Upstream closure of `root` over parents and clocks, emitted with every
/// dependency before its dependents (`root` last). Diagnostics only.
pub fn dependency_closure(graph: &Graph, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![Step::Enter(root)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(id) => {
                if !visited.insert(id) {
                    continue;
                }
                stack.push(Step::Exit(id));
                let node = graph.node(id);
                for &up in node.parents().iter().chain(node.clocks().iter()) {
                    if !visited.contains(&up) {
                        stack.push(Step::Enter(up));
                    }
                }
            }
            Step::Exit(id) => out.push(id),
        }
    }
    out
}
