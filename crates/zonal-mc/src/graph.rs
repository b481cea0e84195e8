//! Reachability graph: arena-allocated nodes with content interning and
//! optional subsumption.
//!
//! Nodes are ids into a vector; back-edges are ids, never owning
//! references, so cycles in the underlying automaton are harmless. The
//! interning pool buckets states by a discrete-part hash and resolves
//! within a bucket through the configured [`StateOrder`].

use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use zonal_dbm::{BoundMap, Scope};
use zonal_model::System;
use zonal_zg::SymState;

/// Node identifier: an index into the graph's arena.
pub type NodeId = usize;

/// A graph node: the interned state plus the two flags the driver mutates.
#[derive(Debug)]
pub struct Node<S> {
    state: S,
    initial: bool,
    is_final: bool,
}

impl<S> Node<S> {
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn initial(&self) -> bool {
        self.initial
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }
}

/// An edge record; `label` carries the fired vedge.
#[derive(Debug)]
pub struct GraphEdge<T> {
    pub src: NodeId,
    pub dst: NodeId,
    pub label: T,
}

/// Interning and subsumption policy over states. `equal` must be the
/// structural equality matching `discrete_hash` bucketing; `covers` may be
/// coarser (inclusion or abstract inclusion) and is what makes
/// [`ReachabilityGraph::add_node`] return an existing subsuming node.
pub trait StateOrder<S> {
    fn discrete_hash(&self, state: &S) -> u64;
    fn equal(&self, a: &S, b: &S) -> bool;
    fn covers(&self, covering: &S, covered: &S) -> bool;
}

/// How `add_node` deduplicates beyond structural equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    /// Structural equality only.
    Equal,
    /// Zone inclusion on equal discrete parts.
    Subset,
    /// Abstract-LU inclusion on equal discrete parts, under the system's
    /// local LU maps for the shared location tuple.
    AluSubset,
}

/// The ready-made [`StateOrder`] over zone-graph states.
pub struct ZgStateOrder {
    system: Arc<System>,
    inclusion: Inclusion,
}

impl ZgStateOrder {
    pub fn new(system: Arc<System>, inclusion: Inclusion) -> ZgStateOrder {
        ZgStateOrder { system, inclusion }
    }
}

impl StateOrder<SymState> for ZgStateOrder {
    fn discrete_hash(&self, state: &SymState) -> u64 {
        state.discrete_hash()
    }

    fn equal(&self, a: &SymState, b: &SymState) -> bool {
        a == b
    }

    fn covers(&self, covering: &SymState, covered: &SymState) -> bool {
        if !covered.same_discrete(covering) {
            return false;
        }
        match self.inclusion {
            Inclusion::Equal => false,
            Inclusion::Subset => covered.zone.is_subset(&covering.zone),
            Inclusion::AluSubset => {
                let dim = self.system.clock_count();
                let mut l = BoundMap::new(dim);
                let mut u = BoundMap::new(dim);
                self.system
                    .clock_bounds()
                    .lu_into(Scope::VLoc(covering.vloc.locs()), &mut l, &mut u);
                covered.zone.alu_le(&covering.zone, &l, &u)
            }
        }
    }
}

/// Directed multigraph of interned symbolic states.
pub struct ReachabilityGraph<S, T, O> {
    order: O,
    nodes: Vec<Node<S>>,
    edges: Vec<GraphEdge<T>>,
    out_edges: Vec<Vec<usize>>,
    in_edges: Vec<Vec<usize>>,
    buckets: HashMap<u64, SmallVec<[NodeId; 2]>, ahash::RandomState>,
}

impl<S, T, O: StateOrder<S>> ReachabilityGraph<S, T, O> {
    pub fn new(order: O) -> ReachabilityGraph<S, T, O> {
        ReachabilityGraph {
            order,
            nodes: Vec::new(),
            edges: Vec::new(),
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            buckets: HashMap::default(),
        }
    }

    /// Intern a state. Returns `(true, id)` for a fresh node, or
    /// `(false, id)` of the structurally equal or subsuming node already
    /// present. Within a bucket, candidates are tried in insertion order.
    pub fn add_node(&mut self, state: S) -> (bool, NodeId) {
        let hash = self.order.discrete_hash(&state);
        let bucket = self.buckets.entry(hash).or_default();
        for &id in bucket.iter() {
            let existing = &self.nodes[id].state;
            if self.order.equal(existing, &state) || self.order.covers(existing, &state) {
                return (false, id);
            }
        }
        let id = self.nodes.len();
        bucket.push(id);
        self.nodes.push(Node {
            state,
            initial: false,
            is_final: false,
        });
        self.out_edges.push(Vec::new());
        self.in_edges.push(Vec::new());
        (true, id)
    }

    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, label: T) {
        let idx = self.edges.len();
        self.edges.push(GraphEdge { src, dst, label });
        self.out_edges[src].push(idx);
        self.in_edges[dst].push(idx);
    }

    pub fn set_initial(&mut self, id: NodeId) {
        self.nodes[id].initial = true;
    }

    pub fn set_final(&mut self, id: NodeId) {
        self.nodes[id].is_final = true;
    }

    pub fn node(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id]
    }

    pub fn state(&self, id: NodeId) -> &S {
        &self.nodes[id].state
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.in_edges[id].len()
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.out_edges[id].len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node<S>)> {
        self.nodes.iter().enumerate()
    }

    pub fn edges(&self) -> &[GraphEdge<T>] {
        &self.edges
    }
}
