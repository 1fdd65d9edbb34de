//! # Cascade Core
//!
//! The event-driven incremental computation engine behind Cascade trading
//! signals.
//!
//! This crate provides:
//! - [`Graph`]: node arena, deduplicated construction, structural
//!   validation, and the synchronous firing loop
//! - [`Node`] / [`NodeKind`] / [`Status`]: the node model with its two
//!   independent edge systems (validity dependencies and triggers)
//! - [`Compute`] / [`ComputeCtx`]: per-node recomputation bodies
//! - [`topo`]: work-stack topological sequencing and closure queries
//! - [`NodeRegistry`]: reconstruction of a configured graph from
//!   serialized parameters
//! - [`EventLoop`]: the cross-thread admission gate for event delivery
//! - [`diag`]: dot rendering and dependency audits for operations
//!
//! ## Architecture
//!
//! ```text
//! Market event ──> SourceNode.fire ──> precomputed order ──┬─> ClockNode.fire
//! (one per event   (replays trigger-    (rebuilt on each   │   (trigger OR)
//!  type)            closure)             edge change)      └─> ValueNode.fire
//!                                                              (gate on parents,
//!                                                               then compute)
//! ```
//!
//! Within a round, nodes execute strictly in the order established by the
//! last structural rebuild, which respects both trigger-edge and
//! dependency-edge precedence. A node whose parents are unusable is not
//! recomputed that round; the branch goes quiet instead of aborting the
//! pass, and recovers by itself on the next round with valid parents.
//!
//! ## Usage
//!
//! ```ignore
//! let mut g = Graph::new();
//! let tick = g.new_source("TickSource");
//! let theo = g.add::<MyTheo>(args)?;
//! g.set_clock(theo, &[tick])?;
//! g.validate()?;          // hard gate before the first event
//! g.fire(tick);           // one synchronous round
//! let px = g.node(theo).value();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clocks;
pub mod compute;
pub mod diag;
pub mod engine;
pub mod error;
pub mod graph;
pub mod node;
pub mod registry;
pub mod topo;

// Re-exports
pub use compute::{AsAny, Compute, ComputeCtx};
pub use engine::EventLoop;
pub use error::{GraphError, GraphResult};
pub use graph::{Graph, GraphStats, NodeSpec};
pub use node::{GraphId, Node, NodeId, NodeKind, Status};
pub use registry::{NodeBuilder, NodeRegistry, Params};
