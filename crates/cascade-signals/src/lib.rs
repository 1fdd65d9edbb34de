//! # Cascade Signals
//!
//! Market signal nodes for the Cascade incremental computation graph.
//!
//! This crate provides the concrete node types a trading deployment hangs
//! off [`cascade_core`]:
//!
//! - [`QuoteFeed`] / [`QuoteBook`]: per-symbol external event sources with
//!   staged bid/ask inputs
//! - [`Midpoint`], [`Ema`], [`CompositeTheo`]: theoretical price signals
//! - [`SpreadGate`]: quoting inhibitor driven by market width
//! - [`register_signals`]: registry wiring for reconstructing a signal
//!   graph from serialized configuration
//!
//! Construction goes through [`Graph::add`], so identical signals requested
//! from different call sites collapse to one shared node.
//!
//! ## Usage
//!
//! ```ignore
//! let mut g = Graph::new();
//! let mid = Midpoint::for_symbol(&mut g, "BTEC:US10Y")?;
//! let smooth = g.add::<Ema>((mid, 16))?;
//! g.validate()?;
//!
//! let feed = QuoteFeed::attach(&mut g, "BTEC:US10Y")?;
//! feed.publish(&mut g, QuoteBook::new(99.5, 100.5));
//! let theo = g.node(smooth).value();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod feed;
mod gate;
mod theo;

pub use feed::{AskQuote, BidQuote, QuoteBook, QuoteFeed, StagedInput, TickSource};
pub use gate::SpreadGate;
pub use theo::{CompositeTheo, Ema, Midpoint};

use serde::Deserialize;

use cascade_core::{Graph, GraphResult, NodeKind, NodeRegistry, Params};

#[derive(Deserialize)]
struct SymbolParams {
    symbol: String,
}

fn default_half_life() -> u32 {
    16
}

#[derive(Deserialize)]
struct EmaParams {
    input: Params,
    #[serde(default = "default_half_life")]
    half_life: u32,
}

#[derive(Deserialize)]
struct LegParams {
    weight_mils: i32,
    node: Params,
}

#[derive(Deserialize)]
struct CompositeParams {
    legs: Vec<LegParams>,
}

#[derive(Deserialize)]
struct SpreadGateParams {
    symbol: String,
    limit_mils: u32,
}

/// Register every signal node type with `registry`.
///
/// Parameter bundles follow the usual contract: a `"type"` field naming the
/// node type, the rest type-specific. Inputs of derived signals are nested
/// bundles, deserialized bottom-up; shared subtrees dedup through the
/// graph's memoization.
pub fn register_signals(registry: &mut NodeRegistry) -> GraphResult<()> {
    registry.register("TickSource", |g, _reg, p| {
        let params: SymbolParams = serde_json::from_value(p.clone())?;
        g.add::<TickSource>(params.symbol)
    })?;

    registry.register("BidQuote", |g, _reg, p| {
        let params: SymbolParams = serde_json::from_value(p.clone())?;
        g.add::<BidQuote>(params.symbol)
    })?;

    registry.register("AskQuote", |g, _reg, p| {
        let params: SymbolParams = serde_json::from_value(p.clone())?;
        g.add::<AskQuote>(params.symbol)
    })?;

    registry.register("Midpoint", |g, _reg, p| {
        let params: SymbolParams = serde_json::from_value(p.clone())?;
        Midpoint::for_symbol(g, &params.symbol)
    })?;

    registry.register("Ema", |g, reg, p| {
        let params: EmaParams = serde_json::from_value(p.clone())?;
        let input = reg.deserialize_expecting(g, &params.input, NodeKind::Value)?;
        g.add::<Ema>((input, params.half_life))
    })?;

    registry.register("CompositeTheo", |g, reg, p| {
        let params: CompositeParams = serde_json::from_value(p.clone())?;
        let mut legs = Vec::with_capacity(params.legs.len());
        for leg in params.legs {
            let node = reg.deserialize_expecting(g, &leg.node, NodeKind::Value)?;
            legs.push((node, leg.weight_mils));
        }
        g.add::<CompositeTheo>(legs)
    })?;

    registry.register("SpreadGate", |g, _reg, p| {
        let params: SpreadGateParams = serde_json::from_value(p.clone())?;
        let feed = QuoteFeed::attach(g, &params.symbol)?;
        g.add::<SpreadGate>((feed.bid, feed.ask, params.limit_mils))
    })?;

    Ok(())
}

/// Build a registry with every signal type registered.
pub fn signal_registry() -> GraphResult<NodeRegistry> {
    let mut registry = NodeRegistry::new();
    register_signals(&mut registry)?;
    Ok(registry)
}

/// Reconstruct a whole signal graph from a list of parameter bundles and
/// run the validity gate.
pub fn load_signal_graph(registry: &NodeRegistry, configs: &[Params]) -> GraphResult<Graph> {
    let mut graph = Graph::new();
    for config in configs {
        registry.deserialize(&mut graph, config)?;
    }
    graph.validate()?;
    Ok(graph)
}
