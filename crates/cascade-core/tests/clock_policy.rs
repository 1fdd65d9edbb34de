//! The clock policy: how `set_clock` arguments split into trigger edges and
//! dependency parents, for every receiver/argument kind combination.

use cascade_core::clocks::AnyClock;
use cascade_core::{Compute, ComputeCtx, Graph, NodeId};

struct Inert;

impl Compute for Inert {
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
        ctx.set_value(0.0);
    }
}

struct Pulse;

impl Compute for Pulse {
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
        ctx.emit();
    }
}

fn value(g: &mut Graph, clock: NodeId) -> NodeId {
    let n = g.new_value_node("Inert", Box::new(Inert));
    g.set_clock(n, &[clock]).unwrap();
    n
}

fn clock(g: &mut Graph, clock: NodeId) -> NodeId {
    let n = g.new_clock_node("Pulse", Box::new(Pulse));
    g.set_clock(n, &[clock]).unwrap();
    n
}

fn has_parent(g: &Graph, node: NodeId, parent: NodeId) -> bool {
    g.node(node).parents().contains(&parent)
}

fn has_clock(g: &Graph, node: NodeId, c: NodeId) -> bool {
    g.node(node).clocks().contains(&c)
}

#[test]
fn value_receiver_with_value_argument_gains_a_parent() {
    let mut g = Graph::new();
    let src = g.new_source("Src");
    let child = value(&mut g, src);
    let grandchild = value(&mut g, child);

    // The argument contributes its clock as the trigger and itself as a
    // dependency.
    assert!(has_clock(&g, grandchild, src));
    assert!(has_parent(&g, grandchild, child));
}

#[test]
fn clock_receiver_with_value_argument_gains_a_parent() {
    let mut g = Graph::new();
    let src = g.new_source("Src");
    let child = value(&mut g, src);

    // Sources are never parents; they always run first.
    assert!(!has_parent(&g, child, src));
    assert!(has_clock(&g, child, src));

    let grandchild = clock(&mut g, child);
    assert!(has_clock(&g, grandchild, src));
    assert!(has_parent(&g, grandchild, child));
}

#[test]
fn value_receiver_with_clock_argument_is_pure_trigger() {
    let mut g = Graph::new();
    let src = g.new_source("Src");
    let child = clock(&mut g, src);
    let grandchild = value(&mut g, child);

    assert!(has_clock(&g, grandchild, child));
    assert!(!has_parent(&g, grandchild, child));
}

#[test]
fn clock_receiver_with_clock_argument_is_pure_trigger() {
    let mut g = Graph::new();
    let src = g.new_source("Src");
    let child = clock(&mut g, src);
    let grandchild = clock(&mut g, child);

    // Clocks don't need their clock as a parent; the trigger relation
    // already sequences them.
    assert!(has_clock(&g, grandchild, child));
    assert!(!has_parent(&g, grandchild, child));
}

#[test]
fn three_deep_chains_always_leave_a_path() {
    type Maker = fn(&mut Graph, NodeId) -> NodeId;
    let makers: [Maker; 2] = [clock, value];

    for mk_child in makers {
        for mk_grandchild in makers {
            for mk_great in makers {
                let mut g = Graph::new();
                let src = g.new_source("Src");
                let child = mk_child(&mut g, src);
                let grandchild = mk_grandchild(&mut g, child);
                let great = mk_great(&mut g, grandchild);

                // Whatever the kinds, each link is either a trigger or a
                // dependency, so ordering is preserved.
                assert!(
                    has_clock(&g, great, grandchild) || has_parent(&g, great, grandchild),
                    "no edge from great-grandchild to grandchild"
                );
                assert!(
                    has_clock(&g, grandchild, child) || has_parent(&g, grandchild, child)
                );
                g.validate().unwrap();
            }
        }
    }
}

#[test]
fn joining_distinct_triggers_materializes_one_any_clock() {
    let mut g = Graph::new();
    let src1 = g.new_source("Src1");
    let src2 = g.new_source("Src2");
    let c1 = clock(&mut g, src1);
    let c2 = clock(&mut g, src2);

    let v = g.new_value_node("Inert", Box::new(Inert));
    g.set_clock(v, &[c1, c2]).unwrap();

    // Exactly one clock, and it is the join node.
    let clocks = g.node(v).clocks();
    assert_eq!(clocks.len(), 1);
    let joined = clocks[0];
    assert_eq!(g.node(joined).type_name(), "AnyClock");
    assert_eq!(g.node(joined).clocks(), &[c1, c2]);

    // Redundant clocks are added as parents so they are sequenced first.
    assert!(has_parent(&g, v, c1));
    assert!(has_parent(&g, v, c2));

    // The same combination requested elsewhere reuses the join.
    let w = g.new_value_node("Inert", Box::new(Inert));
    g.set_clock(w, &[c2, c1]).unwrap();
    assert_eq!(g.node(w).clocks(), &[joined]);

    g.validate().unwrap();
}

#[test]
fn arguments_sharing_a_trigger_need_no_join() {
    let mut g = Graph::new();
    let src = g.new_source("Src");
    let v1 = value(&mut g, src);
    let v2 = value(&mut g, src);

    let v = g.new_value_node("Inert", Box::new(Inert));
    g.set_clock(v, &[v1, v2]).unwrap();

    assert_eq!(g.node(v).clocks(), &[src]);
    assert!(has_parent(&g, v, v1));
    assert!(has_parent(&g, v, v2));
    assert!(g.nodes().all(|n| n.type_name() != "AnyClock"));
}

#[test]
fn any_clock_fires_on_either_source() {
    let mut g = Graph::new();
    let src1 = g.new_source("Src1");
    let src2 = g.new_source("Src2");
    let c1 = clock(&mut g, src1);
    let c2 = clock(&mut g, src2);

    let v = g.new_value_node("Inert", Box::new(Inert));
    g.set_clock(v, &[c1, c2]).unwrap();
    g.validate().unwrap();

    // First round: the join fires v, but c2 (a dependency parent through
    // the redundant-clock rule) has never computed, so v is gated.
    g.fire(src1);
    assert!(g.node(v).ticked());
    assert_eq!(g.node(v).computed_count(), 0);

    // Second round: both parents are OK and v computes.
    g.fire(src2);
    assert!(g.node(v).ticked());
    assert_eq!(g.node(v).computed_count(), 1);

    // Either source alone now recomputes v.
    g.fire(src1);
    assert_eq!(g.node(v).computed_count(), 2);

    let _ = g.add::<AnyClock>(vec![c1, c2]).unwrap();
    // Still the one join node from set_clock.
    assert_eq!(
        g.nodes().filter(|n| n.type_name() == "AnyClock").count(),
        1
    );
}
