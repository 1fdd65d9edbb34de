//! Benchmarks for the firing hot path.
//!
//! Run with: cargo bench -p cascade-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cascade_core::{Compute, ComputeCtx, Graph, NodeId};

struct Seed;

impl Compute for Seed {
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
        let event = ctx.event_id() as f64;
        ctx.set_value(event);
    }
}

struct Link {
    input: NodeId,
}

impl Compute for Link {
    fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
        let upstream = ctx.value(self.input);
        ctx.set_value(upstream + 1.0);
    }
}

/// One source feeding a linear chain of `depth` value nodes.
fn build_chain(depth: usize) -> (Graph, NodeId, NodeId) {
    let mut g = Graph::new();
    let src = g.new_source("Tick");
    let mut head = g.new_value_node("Seed", Box::new(Seed));
    g.set_clock(head, &[src]).expect("chain wiring");
    for _ in 1..depth {
        let link = g.new_value_node("Link", Box::new(Link { input: head }));
        g.set_clock(link, &[head]).expect("chain wiring");
        head = link;
    }
    g.validate().expect("chain must validate");
    (g, src, head)
}

/// One source fanning out to `width` independent value nodes.
fn build_fan(width: usize) -> (Graph, NodeId) {
    let mut g = Graph::new();
    let src = g.new_source("Tick");
    for _ in 0..width {
        let v = g.new_value_node("Seed", Box::new(Seed));
        g.set_clock(v, &[src]).expect("fan wiring");
    }
    g.validate().expect("fan must validate");
    (g, src)
}

fn bench_chain_firing(c: &mut Criterion) {
    let mut group = c.benchmark_group("fire_chain");
    for depth in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let (mut g, src, tail) = build_chain(depth);
            b.iter(|| {
                g.fire(src);
                black_box(g.node(tail).held_value())
            });
        });
    }
    group.finish();
}

fn bench_fan_firing(c: &mut Criterion) {
    let mut group = c.benchmark_group("fire_fan");
    for width in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let (mut g, src) = build_fan(width);
            b.iter(|| {
                g.fire(src);
                black_box(g.event_id())
            });
        });
    }
    group.finish();
}

fn bench_order_rebuild(c: &mut Criterion) {
    c.bench_function("rebuild_order_1000", |b| {
        b.iter(|| {
            let (g, src, _) = build_chain(1000);
            black_box(g.compute_order(src).len())
        });
    });
}

criterion_group!(
    benches,
    bench_chain_firing,
    bench_fan_firing,
    bench_order_rebuild
);
criterion_main!(benches);
