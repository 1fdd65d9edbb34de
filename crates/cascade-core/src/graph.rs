//! The computation graph: node arena, edge maintenance, memoized
//! construction, structural validation, and the synchronous firing loop.
//!
//! The graph owns every node for its whole lifetime. Nodes are addressed by
//! stable [`NodeId`] handles; edges are handle pairs held in per-node
//! adjacency lists, so teardown is one arena drop with no cycle breaking.
//!
//! # Construction
//!
//! Node types implement [`NodeSpec`] and are built through [`Graph::add`],
//! which memoizes on `(type, arguments)`: two independent consumers
//! requesting the same derived signal with the same inputs share one
//! instance and one computation per round. Caches are owned by the graph
//! instance and die with it.
//!
//! # Firing
//!
//! An external event invokes [`Graph::fire`] on its source node. The source
//! walks its precomputed order (rebuilt incrementally on every structural
//! change that reaches it), invoking each node's kind-dispatched fire step
//! in sequence, threading validity. Rounds are fully synchronous; the graph
//! assumes exclusive access for the duration of a round (see
//! [`crate::engine::EventLoop`] for the cross-thread admission gate).

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, trace};

use crate::compute::{Compute, ComputeCtx};
use crate::error::{GraphError, GraphResult};
use crate::node::{GraphId, KindState, Node, NodeId, NodeKind, Status};
use crate::{clocks, diag, topo};

// =============================================================================
// NODE SPECS (memoized construction)
// =============================================================================

/// A constructible node type: the unit of memoized construction.
///
/// `build` creates the node (and recursively any upstream nodes it needs)
/// inside the given graph. [`Graph::add`] consults a per-`(type, Args)`
/// cache first, so `build` runs at most once per distinct argument tuple
/// per graph.
pub trait NodeSpec: 'static {
    /// Constructor arguments; also the memoization key.
    type Args: Clone + Eq + Hash + Send + 'static;

    /// Stable type name, used for default node names and diagnostics.
    const TYPE_NAME: &'static str;

    /// Construct the node and its upstream subgraph.
    fn build(graph: &mut Graph, args: &Self::Args) -> GraphResult<NodeId>;
}

// =============================================================================
// GRAPH
// =============================================================================

/// Owner of the node population and driver of firing rounds.
pub struct Graph {
    id: GraphId,
    pub(crate) nodes: Vec<Node>,
    construct_order: Vec<NodeId>,
    memo: HashMap<TypeId, Box<dyn Any + Send>>,
    event_id: u64,
    started_at: Instant,
    fire_started: Option<Instant>,
    fire_ended: Option<Instant>,
    current_source: Option<NodeId>,
    current_node: Option<NodeId>,
    status_snapshot: Vec<Status>,
    audit_nodes: Vec<NodeId>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("node_count", &self.nodes.len())
            .finish()
    }
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            id: GraphId::next(),
            nodes: Vec::new(),
            construct_order: Vec::new(),
            memo: HashMap::new(),
            event_id: 0,
            started_at: Instant::now(),
            fire_started: None,
            fire_ended: None,
            current_source: None,
            current_node: None,
            status_snapshot: Vec::new(),
            audit_nodes: Vec::new(),
        }
    }

    /// This graph's identity (embedded in every handle it issues).
    pub fn graph_id(&self) -> GraphId {
        self.id
    }

    fn idx(&self, id: NodeId) -> usize {
        debug_assert_eq!(id.graph, self.id, "node handle from a different graph");
        id.index as usize
    }

    /// Borrow a node by handle.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[self.idx(id)]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        let i = self.idx(id);
        &mut self.nodes[i]
    }

    /// Number of nodes owned by this graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over all nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Handles of all nodes in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// Nodes built through [`Graph::add`], in completion order.
    pub fn construct_order(&self) -> &[NodeId] {
        &self.construct_order
    }

    // =========================================================================
    // CONSTRUCTION
    // =========================================================================

    fn insert(
        &mut self,
        state: KindState,
        type_name: &'static str,
        compute: Option<Box<dyn Compute>>,
    ) -> NodeId {
        let id = NodeId {
            graph: self.id,
            index: self.nodes.len() as u32,
        };
        self.nodes.push(Node::new(id, state, type_name, compute));
        id
    }

    /// Create a value node holding one scalar, recomputed by `compute` when
    /// its single clock fires.
    pub fn new_value_node(&mut self, type_name: &'static str, compute: Box<dyn Compute>) -> NodeId {
        self.insert(KindState::Value { value: f64::NAN }, type_name, Some(compute))
    }

    /// Create a clock node whose `compute` decides each round whether to
    /// emit a trigger to its callbacks.
    pub fn new_clock_node(&mut self, type_name: &'static str, compute: Box<dyn Compute>) -> NodeId {
        self.insert(KindState::Clock, type_name, Some(compute))
    }

    /// Create a source node representing one external event type.
    ///
    /// Sources have no compute body: a source's "computation" is entirely
    /// the replay of its firing order.
    pub fn new_source(&mut self, type_name: &'static str) -> NodeId {
        let id = self.insert(
            KindState::Source {
                compute_order: Vec::new(),
            },
            type_name,
            None,
        );
        self.rebuild_compute_order(id);
        id
    }

    /// Memoized construction: build `S` with `args`, or return the instance
    /// a previous identical request produced.
    pub fn add<S: NodeSpec>(&mut self, args: S::Args) -> GraphResult<NodeId> {
        let key = TypeId::of::<S>();
        if let Some(cache) = self.memo.get(&key) {
            if let Some(map) = cache.downcast_ref::<HashMap<S::Args, NodeId>>() {
                if let Some(&id) = map.get(&args) {
                    return Ok(id);
                }
            }
        }

        let id = S::build(self, &args)?;
        if !self.construct_order.contains(&id) {
            self.construct_order.push(id);
        }
        if let Some(map) = self
            .memo
            .entry(key)
            .or_insert_with(|| Box::new(HashMap::<S::Args, NodeId>::new()))
            .downcast_mut::<HashMap<S::Args, NodeId>>()
        {
            map.insert(args, id);
        }
        Ok(id)
    }

    /// Give a node an explicit name.
    ///
    /// Renaming an already-named node to a different name is a
    /// configuration error; setting the same name again is a no-op.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> GraphResult<()> {
        let name = name.into();
        let node = self.node_mut(id);
        match &node.name {
            Some(existing) if *existing != name => Err(GraphError::NameConflict {
                existing: existing.clone(),
                requested: name,
            }),
            _ => {
                node.name = Some(name);
                Ok(())
            }
        }
    }

    /// Borrow a node's compute behavior as its concrete type.
    pub fn behavior<T: Compute>(&self, id: NodeId) -> Option<&T> {
        self.node(id)
            .compute
            .as_deref()
            .and_then(|b| b.as_any().downcast_ref::<T>())
    }

    /// Mutably borrow a node's compute behavior as its concrete type.
    ///
    /// This is how delivery layers stage external input (e.g. a fresh
    /// quote) into a node before firing its source.
    pub fn behavior_mut<T: Compute>(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id)
            .compute
            .as_deref_mut()
            .and_then(|b| b.as_any_mut().downcast_mut::<T>())
    }

    // =========================================================================
    // EDGES
    // =========================================================================

    /// Add a dependency edge: `parent` must be valid before `node` may be
    /// treated as computed-correctly.
    ///
    /// The edge is mirrored in both adjacency lists atomically; duplicates
    /// are rejected silently. Triggers the structural-update pass.
    pub fn set_parent(&mut self, node: NodeId, parent: NodeId) {
        debug_assert_eq!(parent.graph, self.id, "parent handle from a different graph");
        debug_assert_ne!(node, parent, "a node cannot depend on itself");
        if self.add_parent_edge(node, parent) {
            self.structure_changed(node);
        }
    }

    fn add_parent_edge(&mut self, node: NodeId, parent: NodeId) -> bool {
        if self.node(node).parents.contains(&parent) {
            return false;
        }
        let (ni, pi) = (self.idx(node), self.idx(parent));
        self.nodes[ni].parents.push(parent);
        self.nodes[pi].children.push(node);
        true
    }

    fn add_trigger_edge(&mut self, node: NodeId, clock: NodeId) {
        debug_assert!(
            self.node(clock).kind().is_clock(),
            "trigger edge to a non-clock node"
        );
        if self.node(node).clocks.contains(&clock) {
            return;
        }
        let (ni, ci) = (self.idx(node), self.idx(clock));
        self.nodes[ni].clocks.push(clock);
        self.nodes[ci].callbacks.push(node);
    }

    /// The trigger a node contributes when passed to [`Graph::set_clock`]:
    /// the node itself if it is clock-kind, else its single clock.
    ///
    /// For a value node this enforces the exactly-one-clock invariant on
    /// access.
    pub fn trigger_of(&self, id: NodeId) -> GraphResult<NodeId> {
        let node = self.node(id);
        if node.kind().is_clock() {
            return Ok(id);
        }
        match node.clocks.as_slice() {
            [clock] => Ok(*clock),
            other => Err(GraphError::ClockCardinality {
                node: node.display_name(),
                count: other.len(),
            }),
        }
    }

    /// Add trigger edges: `node` recomputes when the inputs' clocks fire.
    ///
    /// The rule is asymmetric between clock receivers and value receivers,
    /// and is deliberate policy rather than an artifact:
    ///
    /// - A clock-kind receiver takes each input's trigger as one of many
    ///   clocks (logical OR). An input that is not itself clock-kind also
    ///   becomes a dependency parent, so its value is ordered before this
    ///   node.
    /// - A value-kind receiver gets exactly one clock: the single distinct
    ///   trigger of the inputs, or a memoized [`clocks::AnyClock`] joining
    ///   them. Every input that is not itself that joined clock, values
    ///   and redundant clocks alike, also becomes a dependency parent.
    ///   Clock nodes sort correctly through the trigger relation alone, but
    ///   a value input contributes only its clock to the join, so without
    ///   the parent edge it could be sequenced after this node.
    pub fn set_clock(&mut self, node: NodeId, inputs: &[NodeId]) -> GraphResult<()> {
        if inputs.is_empty() {
            return Ok(());
        }
        match self.node(node).kind() {
            NodeKind::Clock | NodeKind::Source => {
                for &input in inputs {
                    let trigger = self.trigger_of(input)?;
                    self.add_trigger_edge(node, trigger);
                    if !self.node(input).kind().is_clock() {
                        self.add_parent_edge(node, input);
                    }
                }
            }
            NodeKind::Value => {
                let mut triggers: SmallVec<[NodeId; 4]> = SmallVec::new();
                for &input in inputs {
                    let trigger = self.trigger_of(input)?;
                    if !triggers.contains(&trigger) {
                        triggers.push(trigger);
                    }
                }
                let joined = if triggers.len() == 1 {
                    triggers[0]
                } else {
                    clocks::join_clocks(self, &triggers)?
                };
                self.add_trigger_edge(node, joined);
                debug_assert_eq!(
                    self.node(node).clocks.len(),
                    1,
                    "{}: value node acquired a second clock",
                    self.node(node).display_name()
                );
                for &input in inputs {
                    if input != joined {
                        self.add_parent_edge(node, input);
                    }
                }
            }
        }
        self.structure_changed(node);
        Ok(())
    }

    /// True iff every dependency parent of `id` has status `Ok`.
    ///
    /// `Error`/`Fatal` parents count as unusable, same as `Invalid`.
    pub fn parents_valid(&self, id: NodeId) -> bool {
        self.node(id).parents.iter().all(|&p| self.node(p).valid())
    }

    // =========================================================================
    // STRUCTURAL UPDATES
    // =========================================================================

    /// Dirty-propagation pass run after every edge mutation: expand from
    /// the mutated node through the clock relation until every source that
    /// can fire it is reached, then rebuild each such source's order.
    fn structure_changed(&mut self, start: NodeId) {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut work = vec![start];
        let mut sources: SmallVec<[NodeId; 2]> = SmallVec::new();
        while let Some(id) = work.pop() {
            if !seen.insert(id) {
                continue;
            }
            if self.node(id).kind() == NodeKind::Source {
                sources.push(id);
            } else {
                work.extend(self.node(id).clocks().iter().copied());
            }
        }
        for &source in &sources {
            self.rebuild_compute_order(source);
        }
    }

    fn rebuild_compute_order(&mut self, source: NodeId) {
        let closure = topo::trigger_closure(self, source);
        let full = topo::topological_order(
            self,
            source,
            topo::Follow::TriggersAndChildren,
            Some(&closure),
        );
        debug_assert_eq!(full.first().copied(), Some(source));
        let order: Vec<NodeId> = full.into_iter().filter(|&id| id != source).collect();
        trace!(
            source = %self.node(source).display_name(),
            nodes = order.len(),
            "firing order rebuilt"
        );
        if let KindState::Source { compute_order } = &mut self.node_mut(source).state {
            *compute_order = order;
        }
    }

    /// The precomputed firing order of a source (excludes the source).
    pub fn compute_order(&self, source: NodeId) -> &[NodeId] {
        match &self.node(source).state {
            KindState::Source { compute_order } => compute_order,
            _ => &[],
        }
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Post-construction validity gate.
    ///
    /// Must pass once all nodes for a configuration exist, before any event
    /// is delivered. Checks acyclicity over both edge systems, edge
    /// symmetry, and clock cardinality of value nodes. Failure is a hard
    /// configuration error; none of these conditions can arise from event
    /// processing afterwards.
    pub fn validate(&self) -> GraphResult<()> {
        self.check_acyclic()?;
        self.check_edge_symmetry()?;
        self.check_clock_cardinality()?;
        Ok(())
    }

    /// Convenience form of [`Graph::validate`].
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Successor `i` of node `n` over children followed by callbacks.
    fn forward_edge(&self, n: usize, i: usize) -> Option<NodeId> {
        let node = &self.nodes[n];
        if i < node.children.len() {
            Some(node.children[i])
        } else {
            node.callbacks.get(i - node.children.len()).copied()
        }
    }

    /// Three-color depth-first search over the union of dependency and
    /// trigger edges. A loop through either relation (or both) is reported
    /// as a cycle; the walk itself cannot hang.
    fn check_acyclic(&self) -> GraphResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Grey,
            Black,
        }

        let mut marks = vec![Mark::White; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if marks[start] != Mark::White {
                continue;
            }
            marks[start] = Mark::Grey;
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            while let Some(top) = stack.last_mut() {
                let (n, cursor) = *top;
                match self.forward_edge(n, cursor) {
                    Some(next) => {
                        top.1 += 1;
                        let j = self.idx(next);
                        match marks[j] {
                            Mark::White => {
                                marks[j] = Mark::Grey;
                                stack.push((j, 0));
                            }
                            Mark::Grey => {
                                return Err(GraphError::CyclicGraph {
                                    node: self.nodes[j].display_name(),
                                })
                            }
                            Mark::Black => {}
                        }
                    }
                    None => {
                        marks[n] = Mark::Black;
                        stack.pop();
                    }
                }
            }
        }
        Ok(())
    }

    /// Re-verify that every edge is mirrored exactly once in the inverse
    /// list. Correct edge-mutation code cannot break this; the check guards
    /// against internal bugs, not expected runtime conditions.
    fn check_edge_symmetry(&self) -> GraphResult<()> {
        let count_in = |list: &[NodeId], id: NodeId| list.iter().filter(|&&x| x == id).count();
        for node in &self.nodes {
            for &parent in &node.parents {
                if count_in(&self.node(parent).children, node.id) != 1 {
                    return Err(GraphError::AsymmetricEdge {
                        relation: "parent/child",
                        from: node.display_name(),
                        to: self.node(parent).display_name(),
                    });
                }
            }
            for &child in &node.children {
                if count_in(&self.node(child).parents, node.id) != 1 {
                    return Err(GraphError::AsymmetricEdge {
                        relation: "parent/child",
                        from: node.display_name(),
                        to: self.node(child).display_name(),
                    });
                }
            }
            for &clock in &node.clocks {
                if count_in(&self.node(clock).callbacks, node.id) != 1 {
                    return Err(GraphError::AsymmetricEdge {
                        relation: "clock/callback",
                        from: node.display_name(),
                        to: self.node(clock).display_name(),
                    });
                }
            }
            for &callback in &node.callbacks {
                if count_in(&self.node(callback).clocks, node.id) != 1 {
                    return Err(GraphError::AsymmetricEdge {
                        relation: "clock/callback",
                        from: node.display_name(),
                        to: self.node(callback).display_name(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_clock_cardinality(&self) -> GraphResult<()> {
        for node in &self.nodes {
            if node.kind() == NodeKind::Value && node.clocks.len() != 1 {
                return Err(GraphError::ClockCardinality {
                    node: node.display_name(),
                    count: node.clocks.len(),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // FIRING
    // =========================================================================

    /// Run one synchronous firing round for `source`.
    ///
    /// The source marks itself OK and ticked, then replays its precomputed
    /// order to completion; there is no cancellation. Degradation along the
    /// way is carried in node statuses, never as an error. Topology must
    /// not be mutated from inside a round.
    pub fn fire(&mut self, source: NodeId) {
        let si = self.idx(source);
        debug_assert_eq!(
            self.nodes[si].kind(),
            NodeKind::Source,
            "fire on a non-source node"
        );

        // Debug builds reset the whole graph before firing so ticked flags
        // stay inspectable after the call; release builds reset only this
        // round's participants, after the round. Equivalent at the start of
        // the next round.
        if cfg!(debug_assertions) {
            for node in &mut self.nodes {
                node.ticked = false;
            }
        }

        {
            let src = &mut self.nodes[si];
            src.fired_count += 1;
            src.ticked_count += 1;
            src.computed_count += 1;
            src.emit_count += 1;
            src.status = Status::Ok;
            src.ticked = true;
        }

        self.pre_fire(source);

        let order = match &mut self.nodes[si].state {
            KindState::Source { compute_order } => std::mem::take(compute_order),
            _ => Vec::new(),
        };
        for &id in &order {
            self.current_node = Some(id);
            self.fire_node(id);
        }
        self.current_node = None;

        self.post_fire();

        if !cfg!(debug_assertions) {
            for &id in &order {
                let i = self.idx(id);
                self.nodes[i].ticked = false;
            }
            self.nodes[si].ticked = false;
        }

        if let KindState::Source { compute_order } = &mut self.nodes[si].state {
            *compute_order = order;
        }
    }

    fn fire_node(&mut self, id: NodeId) {
        let i = self.idx(id);
        self.nodes[i].fired_count += 1;
        match self.nodes[i].kind() {
            NodeKind::Value => {
                debug_assert_eq!(
                    self.nodes[i].clocks.len(),
                    1,
                    "{}: value node without exactly one clock",
                    self.nodes[i].display_name()
                );
                let Some(&clock) = self.nodes[i].clocks.first() else {
                    return;
                };
                if !self.nodes[self.idx(clock)].ticked {
                    return;
                }
                self.nodes[i].ticked = true;
                self.nodes[i].ticked_count += 1;
                if self.parents_valid(id) {
                    self.nodes[i].computed_count += 1;
                    self.run_compute(id);
                    if !self.nodes[i].valid() {
                        debug!(
                            node = %self.nodes[i].display_name(),
                            status = %self.nodes[i].status,
                            "node not valid after compute with all parents valid"
                        );
                    }
                } else if self.nodes[i].status == Status::Ok {
                    // Only an OK node is demoted; INIT stays INIT.
                    self.nodes[i].status = Status::Invalid;
                }
            }
            NodeKind::Clock => {
                // React to the first ticked clock in insertion order and
                // ignore the rest: multiple clocks form a logical OR
                // without double-firing.
                let any_ticked = self.nodes[i]
                    .clocks
                    .iter()
                    .any(|&c| self.nodes[self.idx(c)].ticked);
                if !any_ticked {
                    return;
                }
                self.nodes[i].ticked_count += 1;
                if self.parents_valid(id) {
                    self.nodes[i].computed_count += 1;
                    self.run_compute(id);
                    if self.nodes[i].ticked {
                        self.nodes[i].emit_count += 1;
                    }
                    if !self.nodes[i].valid() {
                        debug!(
                            node = %self.nodes[i].display_name(),
                            status = %self.nodes[i].status,
                            "node not valid after compute with all parents valid"
                        );
                    }
                } else if self.nodes[i].status == Status::Ok {
                    self.nodes[i].status = Status::Invalid;
                }
            }
            NodeKind::Source => {
                debug_assert!(false, "source node inside a firing order");
            }
        }
    }

    fn run_compute(&mut self, id: NodeId) {
        let i = self.idx(id);
        let mut body = self.nodes[i].compute.take();
        match body.as_mut() {
            Some(body) => {
                let mut ctx = ComputeCtx { graph: self, node: id };
                body.compute(&mut ctx);
            }
            None => debug_assert!(false, "compute invoked on a node with no compute body"),
        }
        self.nodes[i].compute = body;
    }

    /// Clear a node's ticked flag. Called once per round per participant,
    /// after the round's consumers have observed it.
    pub fn reset(&mut self, id: NodeId) {
        self.node_mut(id).ticked = false;
    }

    // =========================================================================
    // ROUND BOOKKEEPING
    // =========================================================================

    fn pre_fire(&mut self, source: NodeId) {
        if cfg!(debug_assertions) && self.status_snapshot.len() != self.nodes.len() {
            self.status_snapshot = self.nodes.iter().map(|n| n.status).collect();
        }
        self.current_source = Some(source);
        self.event_id += 1;
        self.fire_started = Some(Instant::now());
        trace!(
            event = self.event_id,
            source = %self.node(source).display_name(),
            "firing round started"
        );
    }

    fn post_fire(&mut self) {
        let mut audit_due = false;
        if cfg!(debug_assertions) {
            audit_due = self.report_status_changes();
        }
        // Periodic audit on power-of-two event ids past a floor, so noisy
        // graphs report at a decaying rate.
        if self.event_id > 1024 && self.event_id & (self.event_id - 1) == 0 {
            audit_due = true;
        }
        if audit_due {
            self.run_audits();
        }

        self.fire_ended = Some(Instant::now());
        if let Some(started) = self.fire_started {
            trace!(
                event = self.event_id,
                elapsed_us = started.elapsed().as_micros() as u64,
                "firing round finished"
            );
        }
        self.current_source = None;
    }

    /// Log every status transition since the previous round. Returns true
    /// if anything changed.
    fn report_status_changes(&mut self) -> bool {
        if self.status_snapshot.len() != self.nodes.len() {
            return false;
        }
        let mut changed = false;
        for (i, node) in self.nodes.iter().enumerate() {
            if self.status_snapshot[i] == node.status {
                continue;
            }
            changed = true;
            let parents_valid = node.parents.iter().all(|&p| self.node(p).valid());
            info!(
                node = %node.display_name(),
                from = %self.status_snapshot[i],
                to = %node.status,
                parents_valid,
                "node status changed"
            );
        }
        if changed {
            for (i, node) in self.nodes.iter().enumerate() {
                self.status_snapshot[i] = node.status;
            }
        }
        changed
    }

    /// Flag a node for periodic audit logging of its dependency closure.
    pub fn flag_for_audit(&mut self, id: NodeId) {
        if !self.audit_nodes.contains(&id) {
            self.audit_nodes.push(id);
        }
    }

    fn run_audits(&self) {
        for &id in &self.audit_nodes {
            let report = diag::audit_report(self, id);
            info!(event = self.event_id, node = %self.node(id).display_name(), %report, "node audit");
        }
    }

    // =========================================================================
    // OBSERVABILITY
    // =========================================================================

    /// Sequence number of the most recent external event.
    pub fn event_id(&self) -> u64 {
        self.event_id
    }

    /// The source driving the round in progress, if any.
    pub fn current_source(&self) -> Option<NodeId> {
        self.current_source
    }

    /// The node executing in the round in progress, if any.
    pub fn current_node(&self) -> Option<NodeId> {
        self.current_node
    }

    /// Time since this graph was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Wall-clock duration of the most recently completed firing round.
    pub fn last_fire_duration(&self) -> Option<Duration> {
        match (self.fire_started, self.fire_ended) {
            (Some(started), Some(ended)) => Some(ended.duration_since(started)),
            _ => None,
        }
    }

    /// Aggregate counts over the graph.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            dependency_edges: self.nodes.iter().map(|n| n.parents.len()).sum(),
            trigger_edges: self.nodes.iter().map(|n| n.clocks.len()).sum(),
            event_id: self.event_id,
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// GRAPH STATISTICS
// =============================================================================

/// Aggregate counts over a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of dependency (parent/child) edges.
    pub dependency_edges: usize,
    /// Number of trigger (clock/callback) edges.
    pub trigger_edges: usize,
    /// Events processed so far.
    pub event_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl Compute for Constant {
        fn compute(&mut self, ctx: &mut ComputeCtx<'_>) {
            ctx.set_value(self.0);
        }
    }

    struct ConstantSpec;

    impl NodeSpec for ConstantSpec {
        type Args = u32;
        const TYPE_NAME: &'static str = "Constant";

        fn build(graph: &mut Graph, args: &Self::Args) -> GraphResult<NodeId> {
            Ok(graph.new_value_node(Self::TYPE_NAME, Box::new(Constant(f64::from(*args)))))
        }
    }

    #[test]
    fn test_add_is_memoized() {
        let mut g = Graph::new();
        let a = g.add::<ConstantSpec>(7).unwrap();
        let b = g.add::<ConstantSpec>(7).unwrap();
        let c = g.add::<ConstantSpec>(8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.construct_order(), &[a, c]);
    }

    #[test]
    fn test_handles_are_graph_scoped() {
        let mut g1 = Graph::new();
        let mut g2 = Graph::new();
        let a = g1.add::<ConstantSpec>(1).unwrap();
        let b = g2.add::<ConstantSpec>(1).unwrap();
        assert_ne!(a, b);
        assert_ne!(a.graph_id(), b.graph_id());
    }

    #[test]
    fn test_set_name_rules() {
        let mut g = Graph::new();
        let n = g.add::<ConstantSpec>(1).unwrap();
        assert_eq!(g.node(n).display_name(), format!("Constant#{}", n.index()));

        g.set_name(n, "alpha").unwrap();
        assert_eq!(g.node(n).display_name(), "alpha");
        // Same name again is fine; a different one is rejected.
        g.set_name(n, "alpha").unwrap();
        assert!(matches!(
            g.set_name(n, "beta"),
            Err(GraphError::NameConflict { .. })
        ));
    }

    #[test]
    fn test_duplicate_edges_rejected() {
        let mut g = Graph::new();
        let a = g.add::<ConstantSpec>(1).unwrap();
        let b = g.add::<ConstantSpec>(2).unwrap();
        g.set_parent(b, a);
        g.set_parent(b, a);
        assert_eq!(g.node(b).parents(), &[a]);
        assert_eq!(g.node(a).children(), &[b]);
    }

    #[test]
    fn test_stats_count_both_edge_kinds() {
        let mut g = Graph::new();
        let src = g.new_source("Tick");
        let v = g.add::<ConstantSpec>(1).unwrap();
        g.set_clock(v, &[src]).unwrap();
        let w = g.add::<ConstantSpec>(2).unwrap();
        g.set_clock(w, &[v]).unwrap();

        let stats = g.stats();
        assert_eq!(stats.node_count, 3);
        // v and w are both clocked on the source; w additionally depends on v.
        assert_eq!(stats.trigger_edges, 2);
        assert_eq!(stats.dependency_edges, 1);
    }
}
