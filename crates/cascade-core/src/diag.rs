//! Diagnostic renderings of a graph.
//!
//! Consumers are operational logging and an external graph-layout renderer;
//! nothing here is on the firing hot path.

use std::fmt::Write as _;

use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeKind};
use crate::topo;

fn dot_label(node: &Node) -> String {
    let mut label = format!("{} {}\\n", node.display_name(), node.id());
    if !node.valid() {
        let _ = write!(label, "STATUS:{}\\n", node.status());
    }
    let _ = write!(
        label,
        "computed: {}. invalid: {}.",
        node.computed_count(),
        node.ticked_count().saturating_sub(node.computed_count())
    );
    if node.kind().is_clock() {
        let _ = write!(label, "\\nemits: {}", node.emit_count());
    }
    format!("\"{}\"", label)
}

/// Render the graph in dot format for a graph-layout renderer.
///
/// One line per node with its computed/invalid counters; clocks are drawn
/// red, sources filled and ranked first; solid edges are clock-to-callback,
/// dotted edges parent-to-child.
pub fn render_dot(graph: &Graph) -> String {
    let tab = "    ";
    let mut nodes_dot = String::new();
    for node in graph.nodes() {
        let _ = write!(nodes_dot, "{}{}", tab, dot_label(node));
        let mut attributes = String::new();
        if node.kind() == NodeKind::Source {
            attributes.push_str("style=\"filled\" ");
        }
        if node.kind().is_clock() {
            attributes.push_str("color=\"red\" ");
        }
        if !attributes.is_empty() {
            let _ = write!(nodes_dot, " [ {}]", attributes);
        }
        nodes_dot.push('\n');
    }

    let mut rank_dot = String::from("{ rank=min");
    for node in graph.nodes() {
        if node.kind() == NodeKind::Source {
            let _ = write!(rank_dot, "; {}", dot_label(node));
        }
    }
    rank_dot.push_str("}\n");

    let mut edges_dot = String::new();
    for node in graph.nodes() {
        for &callback in node.callbacks() {
            let _ = writeln!(
                edges_dot,
                "{}{} -> {}",
                tab,
                dot_label(node),
                dot_label(graph.node(callback))
            );
        }
        for &child in node.children() {
            let _ = writeln!(
                edges_dot,
                "{}{} -> {} [style=\"dotted\"]",
                tab,
                dot_label(node),
                dot_label(graph.node(child))
            );
        }
    }

    let mut out = String::from("digraph G {\n");
    out.push_str("\n// Nodes: red=clock\n");
    out.push_str(&nodes_dot);
    out.push_str("\n// Sources at the top\n");
    out.push_str(&rank_dot);
    out.push_str("\n// Edges: dotted=child, solid=callback\n");
    out.push_str(&edges_dot);
    out.push_str("\nlabelloc=\"t\"\n");
    out.push_str("label=\"red nodes=clocks  filled=source  lines=callbacks  dotted=children\"\n");
    out.push_str("}\n");
    out
}

/// Summarize the dependency closure of `id` for operational logging.
///
/// Lists the sources feeding the node with their tick counters, non-source
/// clocks that have barely ever ticked, invalid dependencies, and the
/// interesting subset: invalid dependencies whose own parents are all
/// valid (the place the rot started).
pub fn audit_report(graph: &Graph, id: NodeId) -> String {
    let node = graph.node(id);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "audit of {}: computed: {}. invalid: {}.",
        node.display_name(),
        node.computed_count(),
        node.ticked_count().saturating_sub(node.computed_count())
    );

    let closure = topo::dependency_closure(graph, id);

    let sources: Vec<&Node> = closure
        .iter()
        .map(|&d| graph.node(d))
        .filter(|n| n.kind() == NodeKind::Source)
        .collect();
    let _ = writeln!(out, "{} sources -- emits/ticks:", sources.len());
    for source in &sources {
        let _ = writeln!(
            out,
            "    {}  {}/{}",
            source.display_name(),
            source.emit_count(),
            source.ticked_count()
        );
    }

    let quiet_clocks: Vec<&Node> = closure
        .iter()
        .map(|&d| graph.node(d))
        .filter(|n| n.kind() == NodeKind::Clock && n.ticked_count() < 2)
        .collect();
    let _ = writeln!(
        out,
        "clocks that ticked fewer than twice: {}",
        quiet_clocks.len()
    );
    for clock in &quiet_clocks {
        let _ = writeln!(
            out,
            "    {}  {}/{}",
            clock.display_name(),
            clock.emit_count(),
            clock.ticked_count()
        );
    }

    let invalids: Vec<NodeId> = closure
        .iter()
        .copied()
        .filter(|&d| !graph.node(d).valid())
        .collect();
    let stuck: Vec<NodeId> = invalids
        .iter()
        .copied()
        .filter(|&d| graph.parents_valid(d))
        .collect();

    let _ = writeln!(out, "{} invalid dependencies with valid parents:", stuck.len());
    for d in &stuck {
        let n = graph.node(*d);
        let _ = writeln!(out, "    {}  status: {}", n.display_name(), n.status());
    }
    let _ = writeln!(out, "{} invalid dependencies:", invalids.len());
    for d in &invalids {
        let n = graph.node(*d);
        let _ = writeln!(out, "    {}  status: {}", n.display_name(), n.status());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{Compute, ComputeCtx};

    struct Inert;

    impl Compute for Inert {
        fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
            ctx.set_value(0.0);
        }
    }

    #[test]
    fn test_render_dot_shape() {
        let mut g = Graph::new();
        let src = g.new_source("Tick");
        g.set_name(src, "tick").unwrap();
        let v = g.new_value_node("Inert", Box::new(Inert));
        g.set_name(v, "inert").unwrap();
        g.set_clock(v, &[src]).unwrap();

        let dot = render_dot(&g);
        assert!(dot.starts_with("digraph G {"));
        assert!(dot.contains("rank=min"));
        assert!(dot.contains("tick"));
        assert!(dot.contains("inert"));
        // The trigger edge is solid, so no dotted attribute on it.
        assert!(dot.contains("->"));
    }

    #[test]
    fn test_audit_report_lists_invalid_dependencies() {
        struct Degrade;
        impl Compute for Degrade {
            fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
                ctx.set_status(crate::node::Status::Invalid);
            }
        }

        let mut g = Graph::new();
        let src = g.new_source("Tick");
        let bad = g.new_value_node("Degrade", Box::new(Degrade));
        g.set_name(bad, "bad").unwrap();
        g.set_clock(bad, &[src]).unwrap();
        let leaf = g.new_value_node("Inert", Box::new(Inert));
        g.set_name(leaf, "leaf").unwrap();
        g.set_clock(leaf, &[bad]).unwrap();

        g.fire(src);

        let report = audit_report(&g, leaf);
        assert!(report.contains("audit of leaf"));
        assert!(report.contains("bad  status: INVALID"));
        assert!(report.contains("1 sources"));
    }
}
