//! Sparse roadmap construction engine
//!
//! Decides which candidate states and edges enter the roadmap. Candidates
//! run through four admissibility tests in a fixed order (coverage,
//! connectivity, interface, quality), stopping at the first that fires.
//! The quality test is the delicate one: it maintains per-vertex interface
//! bookkeeping from sampled witness pairs and inserts smoothed connecting
//! paths wherever the spanner stretch bound would otherwise be violated.
//!
//! Construction is seeded from a discretized lattice (optional), then grown
//! by random sampling until enough consecutive candidates are rejected.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

pub mod discretizer;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::{debug, info, trace, warn};

use crate::config::PlannerConfig;
use crate::data_structures::StateId;
use crate::error::PlanningError;
use crate::graph::{EdgeType, InterfacePoints, SparseGraph, SparseVertex, VertexType};
use crate::space::simplify::{shortcut_with_clearance, PathSimplifier, ShortcutSimplifier};
use crate::space::{StateSampler, StateSpace, Termination};

pub use self::discretizer::{GridLatticeDiscretizer, VertexDiscretizer};

/// Construction is single-threaded; one worker slot is in play.
const CONSTRUCTION_THREAD: usize = 0;

/// Witness-sampling attempts per requested near sample.
const MAX_WITNESS_ATTEMPTS: usize = 100;

/// A replacement candidate must sit within this fraction of the
/// visibility radius of the fresh vertex.
const CLOSE_VERTEX_FRACTION: f64 = 0.5;

/// Running totals for one construction session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstructionStats {
    pub random_samples_added: usize,
    pub vertices_moved: usize,
    pub graph_generations: usize,
}

/// Construction engine: owns the derived geometric parameters and the
/// sampling state, and mutates a [`SparseGraph`] through its add paths.
pub struct SparseCriteria<S: StateSpace> {
    config: PlannerConfig,
    space: Arc<S>,
    sampler: Box<dyn StateSampler<S>>,

    sparse_delta: f64,
    dense_delta: f64,
    discretization: f64,
    stretch_factor: f64,
    near_sample_points: usize,

    consecutive_failures: usize,
    use_fourth_criteria: bool,
    /// Force-add mode: lattice seeds rejected by every criterion are still
    /// inserted so the discretization stays complete.
    discretized_insertion: bool,

    stats: ConstructionStats,
    smoother: ShortcutSimplifier,
}

impl<S: StateSpace> SparseCriteria<S> {
    pub fn new(
        space: Arc<S>,
        config: PlannerConfig,
        mut sampler: Box<dyn StateSampler<S>>,
    ) -> Result<Self, PlanningError> {
        config.validate()?;

        let dim = space.dimension() as f64;
        let max_extent = space.max_extent();
        let sparse_delta = config.sparse_delta_fraction * max_extent;
        let dense_delta = config.dense_delta_fraction * max_extent;
        let near_sample_points =
            (config.near_sample_points_multiple * space.dimension() as f64).ceil() as usize;

        let disc_factor = sparse_delta - config.discretize_penetration_dist;
        let discretization = 2.0 * (disc_factor * disc_factor / dim).sqrt();

        let stretch_factor = if config.stretch_factor < f64::EPSILON {
            // Distance to the nearest lattice vertex from a cell center.
            let nearest_lattice_dist = (dim * (0.5 * discretization).powi(2)).sqrt();
            2.0 * discretization / nearest_lattice_dist
        } else {
            config.stretch_factor
        };

        sampler.set_min_clearance(config.obstacle_clearance);

        info!("construction parameters:");
        info!("  max extent        = {max_extent:.6}");
        info!("  sparse delta      = {sparse_delta:.6}");
        info!("  dense delta       = {dense_delta:.6}");
        info!("  discretization    = {discretization:.6}");
        info!("  stretch factor    = {stretch_factor:.6}");
        info!("  near sample points = {near_sample_points}");

        Ok(Self {
            config,
            space,
            sampler,
            sparse_delta,
            dense_delta,
            discretization,
            stretch_factor,
            near_sample_points,
            consecutive_failures: 0,
            use_fourth_criteria: false,
            discretized_insertion: false,
            stats: ConstructionStats::default(),
            smoother: ShortcutSimplifier::new(),
        })
    }

    pub fn sparse_delta(&self) -> f64 {
        self.sparse_delta
    }

    pub fn dense_delta(&self) -> f64 {
        self.dense_delta
    }

    pub fn discretization(&self) -> f64 {
        self.discretization
    }

    pub fn stretch_factor(&self) -> f64 {
        self.stretch_factor
    }

    pub fn stats(&self) -> ConstructionStats {
        self.stats
    }

    /* ------------------------------------------------------------------
     * Top-level construction
     * ------------------------------------------------------------------ */

    /// Build the roadmap: discretized seeding, random growth, tombstone
    /// compaction. An interrupted run leaves a valid (if incomplete)
    /// graph behind.
    pub fn create_roadmap(
        &mut self,
        graph: &mut SparseGraph<S>,
        discretizer: Option<&dyn VertexDiscretizer<S>>,
        termination: &Termination,
    ) -> Result<(), PlanningError> {
        if !self.config.use_random_samples && !self.config.use_discretized_samples {
            warn!("both sample sources are disabled; nothing to construct");
            return Ok(());
        }

        self.consecutive_failures = 0;
        self.use_fourth_criteria = false;

        if self.config.use_discretized_samples {
            match discretizer {
                Some(discretizer) => self.add_discretized_states(graph, discretizer, termination)?,
                None => warn!("discretized seeding requested but no discretizer supplied"),
            }
        }

        if self.config.use_random_samples {
            self.add_random_samples(graph, termination)?;
        }

        graph.remove_deleted_vertices();
        self.stats.graph_generations += 1;

        if self.config.super_debug {
            graph.error_check_duplicate_states();
        }

        let insertions = graph.insertion_stats();
        let cache_stats = graph.cache().stats();
        let (interface_states, missing_interfaces) = graph.interface_storage_stats();
        info!("roadmap generation {} finished:", self.stats.graph_generations);
        info!("  vertices            = {}", graph.live_vertex_count());
        info!("  edges               = {}", graph.edge_count());
        info!("  disjoint sets       = {}", graph.disjoint_set_count());
        info!("  coverage adds       = {}", insertions.coverage);
        info!("  connectivity adds   = {}", insertions.connectivity);
        info!("  interface adds      = {}", insertions.interface);
        info!("  quality adds        = {}", insertions.quality);
        info!("  discretized adds    = {}", insertions.discretized);
        info!("  random samples used = {}", self.stats.random_samples_added);
        info!("  vertices moved      = {}", self.stats.vertices_moved);
        info!(
            "  motion cache        = {} entries, {} checks, {:.1}% cached",
            graph.cache().len(),
            cache_stats.total_checks,
            cache_stats.percent_cached()
        );
        info!(
            "  interface storage   = {} states, {} missing sides",
            interface_states, missing_interfaces
        );

        Ok(())
    }

    /// Seed the graph from the discretizer's lattice. Runs only on an
    /// empty graph; every seed that fails all four criteria is force-added
    /// as DISCRETIZED so the lattice stays complete.
    fn add_discretized_states(
        &mut self,
        graph: &mut SparseGraph<S>,
        discretizer: &dyn VertexDiscretizer<S>,
        termination: &Termination,
    ) -> Result<(), PlanningError> {
        if !graph.is_empty() {
            warn!("discretized seeding skipped: graph is not empty");
            return Ok(());
        }

        let seeds = discretizer.generate_lattice();
        debug!("seeding roadmap from {} lattice states", seeds.len());

        self.discretized_insertion = true;
        for seed in seeds {
            if termination.triggered() {
                break;
            }
            let state_id = graph.add_state(seed);
            self.add_state_to_roadmap(graph, state_id)?;
        }
        self.discretized_insertion = false;
        Ok(())
    }

    /// Random growth loop: sample, run the pipeline, track consecutive
    /// rejections. Enough failures first enable the quality criterion and
    /// later terminate construction.
    fn add_random_samples(
        &mut self,
        graph: &mut SparseGraph<S>,
        termination: &Termination,
    ) -> Result<(), PlanningError> {
        self.stats.random_samples_added = 0;

        loop {
            if termination.triggered() {
                debug!("random sampling interrupted by termination condition");
                break;
            }

            let candidate = self.sampler.sample()?;
            let state_id = graph.add_state(candidate);
            if !self.add_sample(graph, state_id)? {
                break;
            }
        }
        Ok(())
    }

    /// One sampling-loop iteration. Returns false once the failure budget
    /// says construction is done.
    fn add_sample(
        &mut self,
        graph: &mut SparseGraph<S>,
        state_id: StateId,
    ) -> Result<bool, PlanningError> {
        if self.add_state_to_roadmap(graph, state_id)? {
            self.stats.random_samples_added += 1;
            trace!(
                "random sample {} admitted, total {}",
                state_id.0,
                self.stats.random_samples_added
            );
        } else if self.consecutive_failures % 1000 == 0 {
            debug!("random sample rejected, consecutive failures: {}", self.consecutive_failures);
        }

        if self.consecutive_failures >= self.config.fourth_criteria_after_failures
            && !self.use_fourth_criteria
        {
            info!(
                "enabling quality criterion after {} consecutive rejections",
                self.consecutive_failures
            );
            self.use_fourth_criteria = true;
            self.consecutive_failures = 0;
        }

        if self.use_fourth_criteria
            && self.consecutive_failures > self.config.terminate_after_failures
        {
            info!(
                "construction finished: {} consecutive rejections reached",
                self.config.terminate_after_failures
            );
            return Ok(false);
        }
        Ok(true)
    }

    /* ------------------------------------------------------------------
     * Criteria pipeline
     * ------------------------------------------------------------------ */

    /// Run a candidate through the admissibility pipeline. Returns whether
    /// the graph was updated for it.
    pub fn add_state_to_roadmap(
        &mut self,
        graph: &mut SparseGraph<S>,
        state_id: StateId,
    ) -> Result<bool, PlanningError> {
        let (graph_neighbors, visible_neighbors) = self.find_graph_neighbors(graph, state_id);

        let added = if self.check_add_coverage(graph, state_id, &visible_neighbors) {
            self.log_admission(state_id, "coverage");
            true
        } else if self.check_add_connectivity(graph, state_id, &visible_neighbors)? {
            self.log_admission(state_id, "connectivity");
            true
        } else if self.check_add_interface(graph, state_id, &graph_neighbors, &visible_neighbors)? {
            self.log_admission(state_id, "interface");
            true
        } else if self.use_fourth_criteria
            && self.check_add_quality(graph, state_id, &visible_neighbors)?
        {
            self.log_admission(state_id, "quality");
            true
        } else if self.discretized_insertion {
            graph.add_vertex(state_id, VertexType::Discretized);
            self.log_admission(state_id, "discretized");
            true
        } else {
            self.consecutive_failures += 1;
            false
        };

        if added {
            self.consecutive_failures = 0;
        }
        Ok(added)
    }

    fn log_admission(&self, state_id: StateId, criterion: &str) {
        if self.config.verbose_criteria {
            debug!("graph updated for {criterion}, state {}", state_id.0);
        }
    }

    /// Neighbors within the visibility radius, and the visible subset.
    fn find_graph_neighbors(
        &self,
        graph: &SparseGraph<S>,
        state_id: StateId,
    ) -> (Vec<SparseVertex>, Vec<SparseVertex>) {
        let state = graph.cache().state(state_id).clone();
        let graph_neighbors =
            graph.find_neighbors_within(&state, self.sparse_delta, CONSTRUCTION_THREAD);

        let visible_neighbors: Vec<SparseVertex> = graph_neighbors
            .iter()
            .copied()
            .filter(|&v| {
                graph.cache().check_motion(state_id, graph.state_id(v), CONSTRUCTION_THREAD)
            })
            .collect();

        trace!(
            "candidate {}: {} graph neighbors, {} visible",
            state_id.0,
            graph_neighbors.len(),
            visible_neighbors.len()
        );
        (graph_neighbors, visible_neighbors)
    }

    /// First criterion: a candidate no existing vertex can see plugs a
    /// coverage hole. Added alone, without edges.
    fn check_add_coverage(
        &mut self,
        graph: &mut SparseGraph<S>,
        state_id: StateId,
        visible_neighbors: &[SparseVertex],
    ) -> bool {
        if !visible_neighbors.is_empty() {
            return false;
        }
        graph.add_vertex(state_id, VertexType::Coverage);
        true
    }

    /// Second criterion: a candidate that sees two or more disconnected
    /// components becomes the bridge between them.
    fn check_add_connectivity(
        &mut self,
        graph: &mut SparseGraph<S>,
        state_id: StateId,
        visible_neighbors: &[SparseVertex],
    ) -> Result<bool, PlanningError> {
        if visible_neighbors.len() < 2 {
            return Ok(false);
        }

        let mut disconnected: BTreeSet<SparseVertex> = BTreeSet::new();
        for (i, &vi) in visible_neighbors.iter().enumerate() {
            for &vj in &visible_neighbors[i + 1..] {
                if !graph.same_component(vi, vj) {
                    disconnected.insert(vi);
                    disconnected.insert(vj);
                }
            }
        }
        if disconnected.is_empty() {
            return Ok(false);
        }

        let new_vertex = graph.add_vertex(state_id, VertexType::Connectivity);
        self.check_remove_close_vertices(graph, new_vertex)?;

        for &other in &disconnected {
            if graph.state_id(other).is_null() {
                debug!("skipping edge to vertex {}: removed during replacement", other.0);
                continue;
            }
            if self.space.equal_states(graph.vertex_state(other), graph.vertex_state(new_vertex)) {
                warn!("refusing to pair identical states on vertices {} and {}", other.0, new_vertex.0);
                continue;
            }
            if graph.has_edge(new_vertex, other) {
                continue;
            }
            // Earlier edges in this loop may have already unified them.
            if !graph.same_component(other, new_vertex) {
                graph.add_edge(new_vertex, other, EdgeType::Connectivity)?;
            }
        }
        Ok(true)
    }

    /// Third criterion: when the candidate's two closest neighbors are
    /// both visible yet unlinked, either bridge them directly or insert
    /// the candidate between them.
    fn check_add_interface(
        &mut self,
        graph: &mut SparseGraph<S>,
        state_id: StateId,
        graph_neighbors: &[SparseVertex],
        visible_neighbors: &[SparseVertex],
    ) -> Result<bool, PlanningError> {
        if visible_neighbors.len() < 2 {
            return Ok(false);
        }
        if graph_neighbors[0] != visible_neighbors[0] || graph_neighbors[1] != visible_neighbors[1]
        {
            return Ok(false);
        }
        let (n0, n1) = (visible_neighbors[0], visible_neighbors[1]);
        if graph.has_edge(n0, n1) {
            return Ok(false);
        }

        if graph.check_motion_vertices(n0, n1, CONSTRUCTION_THREAD) {
            graph.add_edge(n0, n1, EdgeType::Interface)?;
            if self.discretized_insertion {
                graph.add_vertex(state_id, VertexType::Discretized);
            }
        } else {
            // The neighbors cannot see each other: the candidate itself
            // bridges the interface.
            let new_vertex = graph.add_vertex(state_id, VertexType::Interface);
            if self.check_remove_close_vertices(graph, new_vertex)? {
                return Ok(true);
            }
            for neighbor in [n0, n1] {
                if graph.state_id(neighbor).is_null() {
                    warn!("skipping interface edge: vertex {} was replaced", neighbor.0);
                    continue;
                }
                graph.add_edge(new_vertex, neighbor, EdgeType::Interface)?;
            }
        }
        Ok(true)
    }

    /* ------------------------------------------------------------------
     * Quality criterion
     * ------------------------------------------------------------------ */

    /// Fourth criterion: tighten interface bookkeeping with witness pairs
    /// sampled around the candidate, then add spanner-mandated paths.
    fn check_add_quality(
        &mut self,
        graph: &mut SparseGraph<S>,
        state_id: StateId,
        visible_neighbors: &[SparseVertex],
    ) -> Result<bool, PlanningError> {
        if visible_neighbors.is_empty() {
            if self.config.verbose_quality {
                debug!("quality: no visible neighbors for state {}", state_id.0);
            }
            return Ok(false);
        }

        let candidate_rep = visible_neighbors[0];
        let candidate_state = graph.cache().state(state_id).clone();

        let close_representatives =
            self.find_close_representatives(graph, &candidate_state, candidate_rep)?;
        if self.config.verbose_quality {
            debug!(
                "quality: {} close representatives around state {}",
                close_representatives.len(),
                state_id.0
            );
        }

        let mut updated = false;
        for (&near_rep, near_state) in &close_representatives {
            updated |=
                self.update_pair_points(graph, candidate_rep, &candidate_state, near_rep, near_state);
            updated |=
                self.update_pair_points(graph, near_rep, near_state, candidate_rep, &candidate_state);
        }
        if !updated {
            if self.config.verbose_quality {
                debug!("quality: no interface bookkeeping changed, skipping path test");
            }
            return Ok(false);
        }

        let mut added = self.check_add_path(graph, candidate_rep)?;
        for &near_rep in close_representatives.keys() {
            if self.check_add_path(graph, near_rep)? {
                added = true;
            }
        }
        Ok(added)
    }

    /// Sample witnesses around the candidate and map each to its own
    /// representative. A witness nobody can see aborts the quality step
    /// (after opportunistically covering it).
    fn find_close_representatives(
        &mut self,
        graph: &mut SparseGraph<S>,
        candidate_state: &S::State,
        candidate_rep: SparseVertex,
    ) -> Result<BTreeMap<SparseVertex, S::State>, PlanningError> {
        let mut representatives: BTreeMap<SparseVertex, S::State> = BTreeMap::new();

        for attempt_index in 0..self.near_sample_points {
            let mut witness: Option<S::State> = None;
            for _ in 0..MAX_WITNESS_ATTEMPTS {
                let sampled = match self.sampler.sample_near(candidate_state, self.dense_delta) {
                    Ok(sampled) => sampled,
                    Err(_) => break,
                };
                if self.space.distance(candidate_state, &sampled) > self.dense_delta {
                    continue;
                }
                if !self.space.check_motion(candidate_state, &sampled) {
                    continue;
                }
                witness = Some(sampled);
                break;
            }
            let witness = match witness {
                Some(witness) => witness,
                None => {
                    if self.config.verbose_quality {
                        debug!("quality: witness {} not found", attempt_index);
                    }
                    continue;
                }
            };

            match graph.get_sparse_representative(&witness, self.sparse_delta, CONSTRUCTION_THREAD)
            {
                None => {
                    // Nobody sees the witness: plug the hole and abandon
                    // the dense-path effort for this candidate.
                    if self.space.clearance(&witness) >= self.config.obstacle_clearance {
                        graph.add_vertex_state(witness, VertexType::Coverage);
                    }
                    representatives.clear();
                    return Ok(representatives);
                }
                Some(rep) if rep != candidate_rep => {
                    representatives.entry(rep).or_insert(witness);
                }
                Some(_) => {}
            }
        }
        Ok(representatives)
    }

    /// Try to tighten the interface records stored at `v` for every pair
    /// `{vp, v''}` with `v''` adjacent to `v` but not to `vp`.
    fn update_pair_points(
        &mut self,
        graph: &mut SparseGraph<S>,
        v: SparseVertex,
        q: &S::State,
        vp: SparseVertex,
        qp: &S::State,
    ) -> bool {
        let mut updated = false;
        for vpp in self.adjacent_unconnected(graph, v, vp) {
            if self.distance_check(graph, v, q, vp, qp, vpp) {
                updated = true;
            }
        }
        updated
    }

    /// Live vertices adjacent to `v1` but sharing no edge with `v2`.
    fn adjacent_unconnected(
        &self,
        graph: &SparseGraph<S>,
        v1: SparseVertex,
        v2: SparseVertex,
    ) -> Vec<SparseVertex> {
        graph
            .neighbors(v1)
            .iter()
            .copied()
            .filter(|&adj| adj != v2 && graph.is_live(adj) && !graph.has_edge(adj, v2))
            .collect()
    }

    /// Store `(q, q')` on `vp`'s side of the interface at `v` keyed by
    /// `{vp, vpp}` when it is new or tighter than what is recorded.
    fn distance_check(
        &mut self,
        graph: &mut SparseGraph<S>,
        v: SparseVertex,
        q: &S::State,
        vp: SparseVertex,
        qp: &S::State,
        vpp: SparseVertex,
    ) -> bool {
        let first_side = vp < vpp;
        let existing = graph.interface_data(v, vp, vpp).cloned().unwrap_or_default();

        let (own_present, opposite) = if first_side {
            (existing.has_interface1(), existing.interface2())
        } else {
            (existing.has_interface2(), existing.interface1())
        };

        let should_set = if !own_present {
            true
        } else {
            match opposite {
                // The opposite side is unknown; nothing to compare against.
                None => false,
                Some(opposite_points) => {
                    let tighter = self
                        .space
                        .distance(q, graph.cache().state(opposite_points.inside));
                    tighter < existing.last_distance()
                }
            }
        };
        if !should_set {
            return false;
        }

        let inside = graph.add_state(q.clone());
        let outside = graph.add_state(qp.clone());
        let points = InterfacePoints { inside, outside };
        let new_last_distance = opposite
            .map(|opposite_points| {
                self.space
                    .distance(graph.cache().state(inside), graph.cache().state(opposite_points.inside))
            })
            .unwrap_or(f64::INFINITY);

        let data = graph.interface_data_mut(v, vp, vpp);
        if first_side {
            data.set_interface1(points, |_, _| new_last_distance);
        } else {
            data.set_interface2(points, |_, _| new_last_distance);
        }
        if self.config.verbose_quality {
            debug!(
                "interface at {} for ({}, {}): side {} updated, last distance {:.6}",
                v.0,
                vp.0.min(vpp.0),
                vp.0.max(vpp.0),
                if first_side { 1 } else { 2 },
                new_last_distance
            );
        }
        true
    }

    /// Spanner check around `v`: for each neighbor pair with interface
    /// support, insert a quality path when the stretch bound is violated.
    fn check_add_path(
        &mut self,
        graph: &mut SparseGraph<S>,
        v: SparseVertex,
    ) -> Result<bool, PlanningError> {
        if !graph.is_live(v) {
            return Ok(false);
        }
        let mut violated = false;

        // Snapshot: path insertion below rewires this neighborhood.
        let adjacent: Vec<SparseVertex> =
            graph.neighbors(v).iter().copied().filter(|&adj| graph.is_live(adj)).collect();

        for &vp in &adjacent {
            if violated {
                break;
            }
            if !graph.is_live(vp) {
                continue;
            }
            for vpp in self.adjacent_unconnected(graph, v, vp) {
                if !graph.is_live(v) || !graph.is_live(vp) || !graph.is_live(vpp) {
                    continue;
                }
                let interface_data =
                    graph.interface_data(v, vp, vpp).cloned().unwrap_or_default();

                let midpoint_path = self.max_spanner_path(graph, v, vp, vpp);
                if self.stretch_factor * interface_data.last_distance() < midpoint_path {
                    if self.config.verbose_quality {
                        debug!(
                            "spanner violated at {} for ({}, {}): {:.6} x {:.6} < {:.6}",
                            v.0,
                            vp.0,
                            vpp.0,
                            self.stretch_factor,
                            interface_data.last_distance(),
                            midpoint_path
                        );
                    }
                    if self.add_quality_path(graph, v, vp, vpp, &interface_data)? {
                        violated = true;
                    }
                }
            }
        }
        Ok(violated)
    }

    /// Longest midpoint path the spanner test must certify: max over
    /// qualified `x` of `(d(v', v) + d(v, x)) / 2`.
    fn max_spanner_path(
        &self,
        graph: &SparseGraph<S>,
        v: SparseVertex,
        vp: SparseVertex,
        vpp: SparseVertex,
    ) -> f64 {
        let mut qualified: Vec<SparseVertex> = Vec::new();
        for &x in graph.neighbors(vpp) {
            if !graph.is_live(x) || !graph.has_edge(x, v) || graph.has_edge(x, vp) {
                continue;
            }
            if let Some(data) = graph.interface_data(v, vpp, x) {
                let supported = if vpp < x { data.has_interface1() } else { data.has_interface2() };
                if supported {
                    qualified.push(x);
                }
            }
        }
        qualified.push(vpp);

        let base = graph.distance_between(vp, v);
        qualified
            .into_iter()
            .map(|x| (base + graph.distance_between(v, x)) / 2.0)
            .fold(0.0, f64::max)
    }

    /// Resolve a spanner violation: connect `v'` and `v''` directly when
    /// possible, else thread the stored witness skeleton through `v`,
    /// smooth it, and insert the surviving intermediates.
    fn add_quality_path(
        &mut self,
        graph: &mut SparseGraph<S>,
        v: SparseVertex,
        vp: SparseVertex,
        vpp: SparseVertex,
        interface_data: &crate::graph::InterfaceData,
    ) -> Result<bool, PlanningError> {
        if graph.check_motion_vertices(vp, vpp, CONSTRUCTION_THREAD) {
            if graph.has_edge(vp, vpp) {
                warn!("quality edge ({}, {}) already present", vp.0, vpp.0);
                return Ok(false);
            }
            graph.add_edge(vp, vpp, EdgeType::Quality)?;
            return Ok(true);
        }

        // Orientation: side 1 belongs to the smaller-id neighbor.
        let (near_side, far_side) = if vp < vpp {
            (interface_data.interface1(), interface_data.interface2())
        } else {
            (interface_data.interface2(), interface_data.interface1())
        };
        let (near, far) = match (near_side, far_side) {
            (Some(near), Some(far)) => (near, far),
            _ => {
                debug!("quality path lacks an interface side, skipping");
                return Ok(false);
            }
        };

        let mut path: Vec<S::State> = vec![
            graph.vertex_state(vp).clone(),
            graph.cache().state(near.outside).clone(),
            graph.cache().state(near.inside).clone(),
            graph.vertex_state(v).clone(),
            graph.cache().state(far.inside).clone(),
            graph.cache().state(far.outside).clone(),
            graph.vertex_state(vpp).clone(),
        ];
        self.smooth_quality_path(&mut path);

        if path.len() < 3 {
            debug!("smoothed quality path collapsed to {} states, abandoning", path.len());
            return Ok(false);
        }

        let mut chain: Vec<SparseVertex> = vec![vp];
        let mut add_edges_enabled = true;
        for state in &path[1..path.len() - 1] {
            if self.space.distance(graph.vertex_state(v), state) < self.dense_delta {
                debug!("quality path state nearly duplicates vertex {}, abandoning", v.0);
                return Ok(false);
            }
            if self.space.clearance(state) < self.config.obstacle_clearance {
                debug!("quality path state lacks clearance, keeping vertex chain open-ended");
                add_edges_enabled = false;
                continue;
            }

            let new_vertex = graph.add_vertex_state(state.clone(), VertexType::Quality);
            if self.check_remove_close_vertices(graph, new_vertex)? {
                // The neighborhood was re-indexed; stop threading but
                // report the insertion.
                graph.clear_edges_near_vertex(new_vertex, self.sparse_delta);
                return Ok(true);
            }
            graph.clear_edges_near_vertex(new_vertex, self.sparse_delta);
            if add_edges_enabled {
                chain.push(new_vertex);
            }
        }
        if add_edges_enabled {
            chain.push(vpp);
        }

        for window in chain.windows(2) {
            if window[0] != window[1] && !graph.has_edge(window[0], window[1]) {
                graph.add_edge(window[0], window[1], EdgeType::Quality)?;
            }
        }
        Ok(true)
    }

    /// Smooth a candidate quality path in place.
    fn smooth_quality_path(&mut self, path: &mut Vec<S::State>) {
        if self.config.use_original_smoother {
            self.smoother.simplify(self.space.as_ref(), path, &Termination::never());
            self.smoother.reduce_vertices(self.space.as_ref(), path, 10);
        } else {
            shortcut_with_clearance(self.space.as_ref(), path, self.config.obstacle_clearance);
        }
    }

    /* ------------------------------------------------------------------
     * Close-vertex replacement
     * ------------------------------------------------------------------ */

    /// Merge a near-duplicate neighbor into the freshly added `v1`: if the
    /// nearest vertex sits within half the visibility radius, is not a
    /// quality vertex, and every one of its neighbors can be rehomed onto
    /// `v1`, move its incidences over and tombstone it.
    pub fn check_remove_close_vertices(
        &mut self,
        graph: &mut SparseGraph<S>,
        v1: SparseVertex,
    ) -> Result<bool, PlanningError> {
        if !self.config.use_check_remove_close_vertices {
            return Ok(false);
        }

        // The nearest hit is v1 itself.
        let neighbors = graph.nearest_to_vertex(v1, 2);
        if neighbors.len() <= 1 {
            return Ok(false);
        }
        let v2 = neighbors[1];
        if v1 == v2 {
            warn!("nearest-neighbor query returned the query vertex twice");
            return Ok(false);
        }
        if graph.vertex_type(v2) == VertexType::Quality {
            return Ok(false);
        }
        if graph.distance_between(v1, v2) > self.sparse_delta * CLOSE_VERTEX_FRACTION {
            return Ok(false);
        }
        if !graph.check_motion_vertices(v1, v2, CONSTRUCTION_THREAD) {
            return Ok(false);
        }

        // Every neighbor of v2 must remain reachable from v1.
        let v2_neighbors: Vec<SparseVertex> =
            graph.neighbors(v2).iter().copied().filter(|&v3| graph.is_live(v3)).collect();
        for &v3 in &v2_neighbors {
            if graph.distance_between(v1, v3) > self.sparse_delta {
                return Ok(false);
            }
            if !graph.check_motion_vertices(v1, v3, CONSTRUCTION_THREAD) {
                return Ok(false);
            }
        }

        debug!("replacing vertex {} with nearby vertex {}", v2.0, v1.0);

        // A guard is moving: stored witness pairs around it are stale.
        let v2_state = graph.vertex_state(v2).clone();
        graph.clear_interface_data(&v2_state, self.sparse_delta, CONSTRUCTION_THREAD);

        for &v3 in &v2_neighbors {
            if v3 == v1 || graph.has_edge(v1, v3) {
                continue;
            }
            graph.add_edge(v1, v3, EdgeType::Interface)?;
        }
        graph.remove_vertex(v2);
        self.stats.vertices_moved += 1;
        Ok(true)
    }
}
