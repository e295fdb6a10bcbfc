//! Sparse roadmap graph
//!
//! Undirected graph over sparse vertices with typed edges, a nearest
//! neighbor index, a disjoint-set connectivity forest and per-vertex
//! interface bookkeeping. Vertex ids are arena indices into parallel
//! property storage; handles stay stable between tombstone sweeps and the
//! interface tables reference ids, never pointers.
//!
//! The first `num_threads` vertex slots are reserved query vertices: their
//! state is a scratch slot a worker sets before a nearest-neighbor query
//! and clears afterwards. Query vertices never enter the index.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

pub mod interface;
pub mod search;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cache::MotionCache;
use crate::data_structures::{DisjointSets, NearestNeighborIndex, StateId};
use crate::error::PlanningError;
use crate::space::{NullVisualizer, RoadmapVisualizer, StateSpace};

pub use self::interface::{InterfaceData, InterfacePoints, VertexPair};
pub use self::search::AstarResult;

/// Handle to a vertex of the sparse roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SparseVertex(pub usize);

/// Why a vertex was admitted into the roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexType {
    Coverage,
    Connectivity,
    Interface,
    Quality,
    Discretized,
}

impl VertexType {
    pub fn as_u8(self) -> u8 {
        match self {
            VertexType::Coverage => 0,
            VertexType::Connectivity => 1,
            VertexType::Interface => 2,
            VertexType::Quality => 3,
            VertexType::Discretized => 4,
        }
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => VertexType::Coverage,
            1 => VertexType::Connectivity,
            2 => VertexType::Interface,
            3 => VertexType::Quality,
            4 => VertexType::Discretized,
            _ => return None,
        })
    }
}

/// Why an edge was admitted into the roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    Connectivity,
    Interface,
    Quality,
    Discretized,
}

impl EdgeType {
    pub fn as_u8(self) -> u8 {
        match self {
            EdgeType::Connectivity => 0,
            EdgeType::Interface => 1,
            EdgeType::Quality => 2,
            EdgeType::Discretized => 3,
        }
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => EdgeType::Connectivity,
            1 => EdgeType::Interface,
            2 => EdgeType::Quality,
            3 => EdgeType::Discretized,
            _ => return None,
        })
    }
}

/// Lazy collision verdict attached to an edge. Transitions exactly once,
/// from `NotChecked` to one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeCollisionState {
    NotChecked,
    Free,
    InCollision,
}

/// Per-vertex property record.
#[derive(Debug, Clone)]
struct VertexRecord {
    /// Null id marks a tombstone awaiting compaction (and query slots).
    state_id: StateId,
    vertex_type: VertexType,
    popularity: f64,
    interfaces: HashMap<VertexPair, InterfaceData>,
}

impl VertexRecord {
    fn new(state_id: StateId, vertex_type: VertexType) -> Self {
        Self { state_id, vertex_type, popularity: 0.0, interfaces: HashMap::new() }
    }
}

/// Per-edge property record.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRecord {
    pub weight: f64,
    pub edge_type: EdgeType,
    pub collision: EdgeCollisionState,
}

/// How many vertices each admissibility criterion contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertionStats {
    pub coverage: usize,
    pub connectivity: usize,
    pub interface: usize,
    pub quality: usize,
    pub discretized: usize,
}

impl InsertionStats {
    fn record(&mut self, vertex_type: VertexType) {
        match vertex_type {
            VertexType::Coverage => self.coverage += 1,
            VertexType::Connectivity => self.connectivity += 1,
            VertexType::Interface => self.interface += 1,
            VertexType::Quality => self.quality += 1,
            VertexType::Discretized => self.discretized += 1,
        }
    }
}

/// Sparse near-optimal roadmap.
pub struct SparseGraph<S: StateSpace> {
    space: Arc<S>,
    cache: MotionCache<S>,
    vertices: Vec<VertexRecord>,
    adjacency: Vec<Vec<SparseVertex>>,
    edges: HashMap<VertexPair, EdgeRecord>,
    nn: NearestNeighborIndex,
    disjoint_sets: DisjointSets,
    /// Scratch states for the reserved query vertices, one per worker.
    query_states: Vec<RwLock<Option<S::State>>>,
    num_query_vertices: usize,
    visual: Box<dyn RoadmapVisualizer<S>>,
    insertion_stats: InsertionStats,
    nodes_opened: AtomicUsize,
    nodes_closed: AtomicUsize,
    modified: bool,
    /// Run the expensive internal consistency checks; violations are fatal.
    pub super_debug: bool,
}

impl<S: StateSpace> SparseGraph<S> {
    pub fn new(space: Arc<S>, num_threads: usize) -> Self {
        let num_query_vertices = num_threads.max(1);
        let mut graph = Self {
            cache: MotionCache::new(space.clone(), num_query_vertices),
            space,
            vertices: Vec::new(),
            adjacency: Vec::new(),
            edges: HashMap::new(),
            nn: NearestNeighborIndex::new(),
            disjoint_sets: DisjointSets::new(),
            query_states: Vec::new(),
            num_query_vertices,
            visual: Box::new(NullVisualizer),
            insertion_stats: InsertionStats::default(),
            nodes_opened: AtomicUsize::new(0),
            nodes_closed: AtomicUsize::new(0),
            modified: false,
            super_debug: false,
        };
        graph.initialize_query_vertices();
        graph
    }

    /// Reserve the first `num_threads` vertex slots as query scratch.
    fn initialize_query_vertices(&mut self) {
        for _ in 0..self.num_query_vertices {
            self.vertices.push(VertexRecord::new(StateId::NULL, VertexType::Coverage));
            self.adjacency.push(Vec::new());
            self.query_states.push(RwLock::new(None));
        }
        self.disjoint_sets.reset(self.vertices.len());
    }

    pub fn set_visualizer(&mut self, visual: Box<dyn RoadmapVisualizer<S>>) {
        self.visual = visual;
    }

    pub fn space(&self) -> &Arc<S> {
        &self.space
    }

    pub fn cache(&self) -> &MotionCache<S> {
        &self.cache
    }

    pub fn num_query_vertices(&self) -> usize {
        self.num_query_vertices
    }

    #[inline]
    pub fn is_query_vertex(&self, v: SparseVertex) -> bool {
        v.0 < self.num_query_vertices
    }

    /// A vertex that exists, is not a query slot and is not a tombstone.
    pub fn is_live(&self, v: SparseVertex) -> bool {
        !self.is_query_vertex(v)
            && v.0 < self.vertices.len()
            && !self.vertices[v.0].state_id.is_null()
    }

    /// True when nothing beyond the reserved query vertices exists.
    pub fn is_empty(&self) -> bool {
        self.vertices.len() == self.num_query_vertices
    }

    /// Non-tombstone, non-query vertex count.
    pub fn live_vertex_count(&self) -> usize {
        self.vertices
            .iter()
            .enumerate()
            .skip(self.num_query_vertices)
            .filter(|(_, record)| !record.state_id.is_null())
            .count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Live vertices in id order.
    pub fn live_vertices(&self) -> impl Iterator<Item = SparseVertex> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .skip(self.num_query_vertices)
            .filter(|(_, record)| !record.state_id.is_null())
            .map(|(i, _)| SparseVertex(i))
    }

    pub fn edges_iter(&self) -> impl Iterator<Item = (VertexPair, &EdgeRecord)> + '_ {
        self.edges.iter().map(|(&pair, record)| (pair, record))
    }

    pub fn insertion_stats(&self) -> InsertionStats {
        self.insertion_stats
    }

    /* ------------------------------------------------------------------
     * States
     * ------------------------------------------------------------------ */

    /// Take ownership of a state in the motion cache's store.
    pub fn add_state(&mut self, state: S::State) -> StateId {
        self.cache.add_state(state)
    }

    pub fn state_id(&self, v: SparseVertex) -> StateId {
        self.vertices[v.0].state_id
    }

    /// State of a live vertex.
    pub fn vertex_state(&self, v: SparseVertex) -> &S::State {
        debug_assert!(self.is_live(v), "vertex {v:?} is not live");
        self.cache.state(self.vertices[v.0].state_id)
    }

    pub fn vertex_type(&self, v: SparseVertex) -> VertexType {
        self.vertices[v.0].vertex_type
    }

    pub fn popularity(&self, v: SparseVertex) -> f64 {
        self.vertices[v.0].popularity
    }

    pub fn set_popularity(&mut self, v: SparseVertex, popularity: f64) {
        self.vertices[v.0].popularity = popularity;
    }

    /// Distance between two vertices, resolving reserved query slots to
    /// their scratch states.
    pub fn distance_between(&self, a: SparseVertex, b: SparseVertex) -> f64 {
        let guard_a;
        let state_a: &S::State = if self.is_query_vertex(a) {
            guard_a = self.query_states[a.0].read();
            guard_a.as_ref().expect("query slot read before being set")
        } else {
            self.cache.state(self.vertices[a.0].state_id)
        };
        let guard_b;
        let state_b: &S::State = if self.is_query_vertex(b) {
            guard_b = self.query_states[b.0].read();
            guard_b.as_ref().expect("query slot read before being set")
        } else {
            self.cache.state(self.vertices[b.0].state_id)
        };
        self.space.distance(state_a, state_b)
    }

    /* ------------------------------------------------------------------
     * Vertices
     * ------------------------------------------------------------------ */

    /// Insert a vertex for an already-stored state.
    pub fn add_vertex(&mut self, state_id: StateId, vertex_type: VertexType) -> SparseVertex {
        debug_assert!(!state_id.is_null(), "cannot add a vertex for the null state");
        let v = SparseVertex(self.vertices.len());
        self.vertices.push(VertexRecord::new(state_id, vertex_type));
        self.adjacency.push(Vec::new());
        self.nn.add(v.0);
        self.disjoint_sets.ensure(v.0);
        self.insertion_stats.record(vertex_type);
        self.modified = true;
        trace!("added vertex {} for state {} ({vertex_type:?})", v.0, state_id.0);
        self.visual.vertex_added(self.cache.state(state_id), vertex_type);
        v
    }

    /// Store `state` and insert a vertex for it.
    pub fn add_vertex_state(&mut self, state: S::State, vertex_type: VertexType) -> SparseVertex {
        let state_id = self.cache.add_state(state);
        self.add_vertex(state_id, vertex_type)
    }

    /// Tombstone a vertex: null its state id, clear its interface table
    /// and drop it from the index. Incident edges stay behind until the
    /// next `remove_deleted_vertices` sweep.
    pub fn remove_vertex(&mut self, v: SparseVertex) {
        debug_assert!(self.is_live(v), "removing a vertex that is not live");
        self.visual.vertex_removed(self.cache.state(self.vertices[v.0].state_id));
        self.vertices[v.0].state_id = StateId::NULL;
        self.vertices[v.0].interfaces.clear();
        self.nn.remove(v.0);
        self.modified = true;
        trace!("tombstoned vertex {}", v.0);
    }

    /// Compact the vertex id space, dropping tombstones and their residual
    /// edges. Vertex ids shift; callers must not cache handles across this.
    pub fn remove_deleted_vertices(&mut self) {
        let mut remap: HashMap<SparseVertex, SparseVertex> = HashMap::new();
        for slot in 0..self.num_query_vertices {
            remap.insert(SparseVertex(slot), SparseVertex(slot));
        }

        let mut kept: Vec<VertexRecord> = self.vertices[..self.num_query_vertices].to_vec();
        for (index, record) in self.vertices.iter().enumerate().skip(self.num_query_vertices) {
            if !record.state_id.is_null() {
                remap.insert(SparseVertex(index), SparseVertex(kept.len()));
                kept.push(record.clone());
            }
        }
        let removed = self.vertices.len() - kept.len();

        // Remap interface keys; entries naming a dead vertex go with it.
        for record in kept.iter_mut().skip(self.num_query_vertices) {
            let old_interfaces = std::mem::take(&mut record.interfaces);
            record.interfaces = old_interfaces
                .into_iter()
                .filter_map(|(pair, data)| {
                    let first = remap.get(&pair.first())?;
                    let second = remap.get(&pair.second())?;
                    Some((VertexPair::new(*first, *second), data))
                })
                .collect();
        }

        let mut edges: HashMap<VertexPair, EdgeRecord> = HashMap::new();
        for (pair, record) in self.edges.drain() {
            if let (Some(&a), Some(&b)) = (remap.get(&pair.first()), remap.get(&pair.second())) {
                edges.insert(VertexPair::new(a, b), record);
            }
        }

        self.vertices = kept;
        self.edges = edges;
        self.rebuild_adjacency();
        self.nn.clear();
        for index in self.num_query_vertices..self.vertices.len() {
            self.nn.add(index);
        }
        self.rebuild_disjoint_sets();
        self.modified = true;
        debug!("compacted {} tombstoned vertices, {} remain", removed, self.live_vertex_count());
    }

    /* ------------------------------------------------------------------
     * Edges
     * ------------------------------------------------------------------ */

    /// Insert an undirected edge; the weight is the state-space distance
    /// between the endpoint states.
    pub fn add_edge(
        &mut self,
        v1: SparseVertex,
        v2: SparseVertex,
        edge_type: EdgeType,
    ) -> Result<(), PlanningError> {
        if v1 == v2 {
            return Err(PlanningError::InvalidArgument(format!("self edge on vertex {}", v1.0)));
        }
        if !self.is_live(v1) || !self.is_live(v2) {
            return Err(PlanningError::NotFound(format!(
                "edge endpoint {} or {} is not live",
                v1.0, v2.0
            )));
        }
        let weight = self.distance_between(v1, v2);
        self.add_edge_with_weight(v1, v2, edge_type, weight)
    }

    /// Edge insertion with an externally supplied weight (persistence load).
    pub(crate) fn add_edge_with_weight(
        &mut self,
        v1: SparseVertex,
        v2: SparseVertex,
        edge_type: EdgeType,
        weight: f64,
    ) -> Result<(), PlanningError> {
        if v1 == v2 {
            return Err(PlanningError::InvalidArgument(format!(
                "self edge on vertex {}",
                v1.0
            )));
        }
        if !self.is_live(v1) || !self.is_live(v2) {
            return Err(PlanningError::NotFound(format!(
                "edge endpoint {} or {} is not live",
                v1.0, v2.0
            )));
        }
        let pair = VertexPair::new(v1, v2);
        if self.edges.contains_key(&pair) {
            return Err(PlanningError::InvalidArgument(format!(
                "edge ({}, {}) already present",
                v1.0, v2.0
            )));
        }

        self.edges.insert(
            pair,
            EdgeRecord { weight, edge_type, collision: EdgeCollisionState::NotChecked },
        );
        self.adjacency[v1.0].push(v2);
        self.adjacency[v2.0].push(v1);
        self.disjoint_sets.union(v1.0, v2.0);
        self.modified = true;
        trace!("added edge ({}, {}) weight {:.4} ({edge_type:?})", v1.0, v2.0, weight);
        self.visual.edge_added(self.vertex_state(v1), self.vertex_state(v2), edge_type);
        Ok(())
    }

    pub fn has_edge(&self, v1: SparseVertex, v2: SparseVertex) -> bool {
        v1 != v2 && self.edges.contains_key(&VertexPair::new(v1, v2))
    }

    pub fn edge(&self, v1: SparseVertex, v2: SparseVertex) -> Option<&EdgeRecord> {
        if v1 == v2 {
            return None;
        }
        self.edges.get(&VertexPair::new(v1, v2))
    }

    /// Record a lazy collision verdict. An edge's verdict transitions away
    /// from `NotChecked` at most once; contradicting a terminal verdict is
    /// an internal error.
    pub fn mark_edge_collision(
        &mut self,
        v1: SparseVertex,
        v2: SparseVertex,
        verdict: EdgeCollisionState,
    ) {
        let record = self
            .edges
            .get_mut(&VertexPair::new(v1, v2))
            .expect("marking collision on a missing edge");
        match record.collision {
            EdgeCollisionState::NotChecked => record.collision = verdict,
            current => {
                debug_assert_eq!(current, verdict, "edge verdict may not flip");
            }
        }
        self.modified = true;
    }

    /// Forget all lazy collision verdicts (environment oracle replaced).
    pub fn clear_edge_collision_states(&mut self) {
        for record in self.edges.values_mut() {
            record.collision = EdgeCollisionState::NotChecked;
        }
        self.modified = true;
    }

    /// Adjacency list of `v`. May mention tombstoned vertices until the
    /// next compaction sweep.
    pub fn neighbors(&self, v: SparseVertex) -> &[SparseVertex] {
        &self.adjacency[v.0]
    }

    fn remove_edge(&mut self, pair: VertexPair) {
        if self.edges.remove(&pair).is_some() {
            self.adjacency[pair.first().0].retain(|&n| n != pair.second());
            self.adjacency[pair.second().0].retain(|&n| n != pair.first());
            self.modified = true;
        }
    }

    fn rebuild_adjacency(&mut self) {
        self.adjacency = vec![Vec::new(); self.vertices.len()];
        for pair in self.edges.keys() {
            self.adjacency[pair.first().0].push(pair.second());
            self.adjacency[pair.second().0].push(pair.first());
        }
    }

    /// Union-find cannot split, so removals rebuild the forest from the
    /// surviving edge set.
    fn rebuild_disjoint_sets(&mut self) {
        self.disjoint_sets.reset(self.vertices.len());
        for pair in self.edges.keys() {
            self.disjoint_sets.union(pair.first().0, pair.second().0);
        }
    }

    /* ------------------------------------------------------------------
     * Connectivity
     * ------------------------------------------------------------------ */

    pub fn same_component(&mut self, v1: SparseVertex, v2: SparseVertex) -> bool {
        self.disjoint_sets.same_set(v1.0, v2.0)
    }

    /// Number of connected components over live vertices.
    pub fn disjoint_set_count(&mut self) -> usize {
        let live: Vec<usize> = self.live_vertices().map(|v| v.0).collect();
        self.disjoint_sets.count_sets(live.into_iter())
    }

    /* ------------------------------------------------------------------
     * Proximity queries
     * ------------------------------------------------------------------ */

    /// All non-query vertices within `radius` of `state`, closest first.
    /// Routes through the worker's reserved query slot.
    pub fn find_neighbors_within(
        &self,
        state: &S::State,
        radius: f64,
        thread_id: usize,
    ) -> Vec<SparseVertex> {
        let query = SparseVertex(thread_id);
        *self.query_states[thread_id].write() = Some(state.clone());
        let result = self
            .nn
            .nearest_within(radius, |id| self.distance_between(query, SparseVertex(id)))
            .into_iter()
            .map(SparseVertex)
            .collect();
        *self.query_states[thread_id].write() = None;
        result
    }

    /// The `k` nearest non-query vertices to `state`, closest first.
    pub fn find_nearest_k(&self, state: &S::State, k: usize, thread_id: usize) -> Vec<SparseVertex> {
        let query = SparseVertex(thread_id);
        *self.query_states[thread_id].write() = Some(state.clone());
        let result = self
            .nn
            .nearest_k(k, |id| self.distance_between(query, SparseVertex(id)))
            .into_iter()
            .map(SparseVertex)
            .collect();
        *self.query_states[thread_id].write() = None;
        result
    }

    /// The `k` nearest vertices to an existing live vertex (the vertex
    /// itself is usually the first hit).
    pub fn nearest_to_vertex(&self, v: SparseVertex, k: usize) -> Vec<SparseVertex> {
        self.nn
            .nearest_k(k, |id| self.distance_between(v, SparseVertex(id)))
            .into_iter()
            .map(SparseVertex)
            .collect()
    }

    /// Nearest vertex within `radius` of `state` whose motion to it is
    /// free: the state's Voronoi representative.
    pub fn get_sparse_representative(
        &self,
        state: &S::State,
        radius: f64,
        thread_id: usize,
    ) -> Option<SparseVertex> {
        self.find_neighbors_within(state, radius, thread_id)
            .into_iter()
            .find(|&v| self.space.check_motion(state, self.vertex_state(v)))
    }

    /* ------------------------------------------------------------------
     * Neighborhood maintenance
     * ------------------------------------------------------------------ */

    /// Remove every edge incident on any vertex within `radius` of `v`
    /// (including `v` itself).
    pub fn clear_edges_near_vertex(&mut self, v: SparseVertex, radius: f64) {
        let nearby: Vec<SparseVertex> = self
            .nn
            .nearest_within(radius, |id| self.distance_between(v, SparseVertex(id)))
            .into_iter()
            .map(SparseVertex)
            .collect();
        let mut doomed: Vec<VertexPair> = Vec::new();
        for &near in &nearby {
            for &other in &self.adjacency[near.0] {
                doomed.push(VertexPair::new(near, other));
            }
        }
        doomed.sort_unstable();
        doomed.dedup();
        let count = doomed.len();
        for pair in doomed {
            self.remove_edge(pair);
        }
        self.rebuild_disjoint_sets();
        debug!("cleared {} edges around vertex {}", count, v.0);
    }

    /// Drop the interface tables of every vertex whose region a new guard
    /// at `state` invalidates.
    pub fn clear_interface_data(&mut self, state: &S::State, radius: f64, thread_id: usize) {
        let nearby = self.find_neighbors_within(state, radius, thread_id);
        for v in nearby {
            self.vertices[v.0].interfaces.clear();
        }
        self.modified = true;
    }

    pub fn clear_vertex_interfaces(&mut self, v: SparseVertex) {
        self.vertices[v.0].interfaces.clear();
        self.modified = true;
    }

    /* ------------------------------------------------------------------
     * Interface table
     * ------------------------------------------------------------------ */

    /// Interface record at `v` for the canonical pair `{vp, vpp}`,
    /// created empty on first access.
    pub fn interface_data_mut(
        &mut self,
        v: SparseVertex,
        vp: SparseVertex,
        vpp: SparseVertex,
    ) -> &mut InterfaceData {
        let pair = VertexPair::new(vp, vpp);
        self.vertices[v.0].interfaces.entry(pair).or_default()
    }

    pub fn interface_data(
        &self,
        v: SparseVertex,
        vp: SparseVertex,
        vpp: SparseVertex,
    ) -> Option<&InterfaceData> {
        self.vertices[v.0].interfaces.get(&VertexPair::new(vp, vpp))
    }

    pub fn interfaces(&self, v: SparseVertex) -> &HashMap<VertexPair, InterfaceData> {
        &self.vertices[v.0].interfaces
    }

    /// (witness states stored, half-populated interfaces) across the graph.
    pub fn interface_storage_stats(&self) -> (usize, usize) {
        let mut states = 0;
        let mut missing = 0;
        for record in self.vertices.iter().skip(self.num_query_vertices) {
            for data in record.interfaces.values() {
                if data.has_interface1() {
                    states += 2;
                } else {
                    missing += 1;
                }
                if data.has_interface2() {
                    states += 2;
                } else {
                    missing += 1;
                }
            }
        }
        (states, missing)
    }

    /* ------------------------------------------------------------------
     * Cached motion checks
     * ------------------------------------------------------------------ */

    /// Cached motion check keyed through the vertices' current state ids.
    pub fn check_motion_vertices(
        &self,
        v1: SparseVertex,
        v2: SparseVertex,
        thread_id: usize,
    ) -> bool {
        self.cache.check_motion(self.state_id(v1), self.state_id(v2), thread_id)
    }

    /* ------------------------------------------------------------------
     * A* statistics
     * ------------------------------------------------------------------ */

    pub(crate) fn record_node_opened(&self) {
        self.nodes_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_node_closed(&self) {
        self.nodes_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn search_stats(&self) -> (usize, usize) {
        (self.nodes_opened.load(Ordering::Relaxed), self.nodes_closed.load(Ordering::Relaxed))
    }

    /* ------------------------------------------------------------------
     * Persistence bookkeeping
     * ------------------------------------------------------------------ */

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    /* ------------------------------------------------------------------
     * Consistency checks (super-debug)
     * ------------------------------------------------------------------ */

    /// Scan for distinct live vertices carrying equal states. A hit means
    /// the admission pipeline is broken; there is no recovery path that
    /// preserves correctness, so this is fatal.
    pub fn error_check_duplicate_states(&self) {
        let live: Vec<SparseVertex> = self.live_vertices().collect();
        for (i, &a) in live.iter().enumerate() {
            for &b in &live[i + 1..] {
                if self.space.equal_states(self.vertex_state(a), self.vertex_state(b)) {
                    panic!(
                        "duplicate states on vertices {} and {} (state ids {} and {})",
                        a.0,
                        b.0,
                        self.state_id(a).0,
                        self.state_id(b).0
                    );
                }
            }
        }
    }

    /// Cross-check every structural invariant that is cheap enough to
    /// assert in integration tests.
    pub fn check_invariants(&mut self) -> Result<(), String> {
        for v in self.live_vertices().collect::<Vec<_>>() {
            if self.cache.store().get(self.state_id(v)).is_none() {
                return Err(format!("vertex {} references dead state {}", v.0, self.state_id(v).0));
            }
            if !self.nn.contains(v.0) {
                return Err(format!("live vertex {} missing from the index", v.0));
            }
        }
        for slot in 0..self.num_query_vertices {
            if self.nn.contains(slot) {
                return Err(format!("query vertex {slot} found in the index"));
            }
        }
        let pairs: Vec<VertexPair> = self.edges.keys().copied().collect();
        for pair in pairs {
            let (a, b) = (pair.first(), pair.second());
            if a == b {
                return Err(format!("self edge on vertex {}", a.0));
            }
            if !self.is_live(a) || !self.is_live(b) {
                // Edges to tombstones linger until compaction; that is
                // legal mid-construction but not after a sweep.
                continue;
            }
            if !self.same_component(a, b) {
                return Err(format!("edge ({}, {}) spans components", a.0, b.0));
            }
            let weight = self.edges[&pair].weight;
            let distance = self.distance_between(a, b);
            if (weight - distance).abs() > 1e-9 * distance.max(1.0) {
                return Err(format!(
                    "edge ({}, {}) weight {} disagrees with distance {}",
                    a.0, b.0, weight, distance
                ));
            }
        }
        for v in self.live_vertices().collect::<Vec<_>>() {
            for pair in self.interfaces(v).keys() {
                if pair.first() >= pair.second() {
                    return Err(format!("non-canonical interface key at vertex {}", v.0));
                }
            }
        }
        Ok(())
    }
}

impl<S: StateSpace> std::fmt::Debug for SparseGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseGraph")
            .field("vertices", &self.live_vertex_count())
            .field("edges", &self.edges.len())
            .field("query_slots", &self.num_query_vertices)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::real_vector::RealVectorSpace;

    fn square_graph() -> SparseGraph<RealVectorSpace> {
        let space = Arc::new(RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0]));
        SparseGraph::new(space, 1)
    }

    fn add(graph: &mut SparseGraph<RealVectorSpace>, x: f64, y: f64) -> SparseVertex {
        graph.add_vertex_state(vec![x, y], VertexType::Coverage)
    }

    #[test]
    fn query_slots_are_reserved_and_unindexed() {
        let graph = square_graph();
        assert!(graph.is_empty());
        assert_eq!(graph.live_vertex_count(), 0);
        assert!(graph.is_query_vertex(SparseVertex(0)));
        assert!(graph.find_neighbors_within(&vec![0.5, 0.5], 1.0, 0).is_empty());
    }

    #[test]
    fn edges_union_components_and_carry_distance_weights() {
        let mut graph = square_graph();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 0.5, 0.0);
        let c = add(&mut graph, 0.0, 0.5);
        assert_eq!(graph.disjoint_set_count(), 3);

        graph.add_edge(a, b, EdgeType::Connectivity).unwrap();
        assert!(graph.same_component(a, b));
        assert!(!graph.same_component(a, c));
        assert_eq!(graph.disjoint_set_count(), 2);
        assert!((graph.edge(a, b).unwrap().weight - 0.5).abs() < 1e-12);
    }

    #[test]
    fn add_edge_rejects_self_loops_and_duplicates() {
        let mut graph = square_graph();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 0.5, 0.0);
        assert!(graph.add_edge(a, a, EdgeType::Interface).is_err());
        graph.add_edge(a, b, EdgeType::Interface).unwrap();
        assert!(graph.add_edge(b, a, EdgeType::Interface).is_err());
    }

    #[test]
    fn tombstone_then_compact_drops_residual_edges() {
        let mut graph = square_graph();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 0.5, 0.0);
        let c = add(&mut graph, 1.0, 0.0);
        graph.add_edge(a, b, EdgeType::Connectivity).unwrap();
        graph.add_edge(b, c, EdgeType::Connectivity).unwrap();

        graph.remove_vertex(b);
        assert_eq!(graph.live_vertex_count(), 2);
        // Residual edges still reference the tombstone until the sweep.
        assert_eq!(graph.edge_count(), 2);

        graph.remove_deleted_vertices();
        assert_eq!(graph.live_vertex_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        for v in graph.live_vertices().collect::<Vec<_>>() {
            assert!(!graph.state_id(v).is_null());
        }
        assert_eq!(graph.disjoint_set_count(), 2);
        graph.check_invariants().unwrap();
    }

    #[test]
    fn compaction_remaps_interface_tables() {
        let mut graph = square_graph();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 0.2, 0.0);
        let c = add(&mut graph, 0.4, 0.0);
        let d = add(&mut graph, 0.6, 0.0);
        let inside = graph.add_state(vec![0.1, 0.0]);
        let outside = graph.add_state(vec![0.1, 0.1]);
        graph
            .interface_data_mut(b, c, d)
            .set_interface1(InterfacePoints { inside, outside }, |_, _| unreachable!());

        graph.remove_vertex(a);
        graph.remove_deleted_vertices();

        // b, c, d shifted down by one slot.
        let (b, c, d) = (SparseVertex(b.0 - 1), SparseVertex(c.0 - 1), SparseVertex(d.0 - 1));
        let data = graph.interface_data(b, c, d).expect("remapped interface entry");
        assert!(data.has_interface1());
        assert_eq!(data.last_distance(), f64::INFINITY);
    }

    #[test]
    fn clear_edges_near_vertex_rebuilds_connectivity() {
        let mut graph = square_graph();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 0.1, 0.0);
        let far1 = add(&mut graph, 0.8, 0.8);
        let far2 = add(&mut graph, 0.9, 0.8);
        graph.add_edge(a, b, EdgeType::Connectivity).unwrap();
        graph.add_edge(far1, far2, EdgeType::Connectivity).unwrap();

        graph.clear_edges_near_vertex(a, 0.2);
        assert!(!graph.has_edge(a, b));
        assert!(graph.has_edge(far1, far2));
        assert!(!graph.same_component(a, b));
        assert!(graph.same_component(far1, far2));
    }

    #[test]
    fn representative_requires_visibility() {
        use crate::space::real_vector::BoxRegion;
        let space = Arc::new(
            RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0])
                .with_obstacle(BoxRegion::new(vec![0.2, 0.0], vec![0.3, 1.0])),
        );
        let mut graph = SparseGraph::new(space, 1);
        let blocked = graph.add_vertex_state(vec![0.1, 0.5], VertexType::Coverage);
        let visible = graph.add_vertex_state(vec![0.6, 0.5], VertexType::Coverage);

        // The nearest neighbor sits across the wall; the representative
        // must be the farther, visible vertex.
        let rep = graph.get_sparse_representative(&vec![0.4, 0.5], 0.5, 0).unwrap();
        assert_eq!(rep, visible);
        assert_ne!(rep, blocked);
    }

    #[test]
    fn collision_verdict_is_write_once() {
        let mut graph = square_graph();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 0.5, 0.0);
        graph.add_edge(a, b, EdgeType::Quality).unwrap();
        assert_eq!(graph.edge(a, b).unwrap().collision, EdgeCollisionState::NotChecked);

        graph.mark_edge_collision(a, b, EdgeCollisionState::InCollision);
        assert_eq!(graph.edge(a, b).unwrap().collision, EdgeCollisionState::InCollision);

        graph.clear_edge_collision_states();
        assert_eq!(graph.edge(a, b).unwrap().collision, EdgeCollisionState::NotChecked);
    }

    #[test]
    #[should_panic(expected = "duplicate states")]
    fn duplicate_state_scan_is_fatal() {
        let mut graph = square_graph();
        add(&mut graph, 0.3, 0.3);
        add(&mut graph, 0.3, 0.3);
        graph.error_check_duplicate_states();
    }
}
