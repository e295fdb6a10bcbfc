//! Path retrieval over the sparse roadmap
//!
//! Answers start/goal queries against a constructed roadmap: locate
//! visible entry and exit vertices, run lazily collision-checked A*
//! between them, then stitch the vertex path back to the caller's exact
//! endpoints. Edges found to be in collision are disabled permanently and
//! the search re-runs until a clean path emerges or the pair is exhausted.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::sync::Arc;

use log::{debug, info};

use crate::error::PlanningError;
use crate::graph::{AstarResult, EdgeCollisionState, SparseGraph, SparseVertex};
use crate::space::simplify::{PathSimplifier, ShortcutSimplifier};
use crate::space::{StateSpace, Termination};

/// Retrieval runs on worker slot 0.
const QUERY_THREAD: usize = 0;

/// Retrieval engine for start/goal queries.
pub struct PathRetriever<S: StateSpace> {
    space: Arc<S>,
    smoothing_enabled: bool,
    simplifier: ShortcutSimplifier,
}

impl<S: StateSpace> PathRetriever<S> {
    pub fn new(space: Arc<S>) -> Self {
        Self { space, smoothing_enabled: true, simplifier: ShortcutSimplifier::new() }
    }

    pub fn with_smoothing(mut self, enabled: bool) -> Self {
        self.smoothing_enabled = enabled;
        self
    }

    /// Candidate entry/exit count scales with dimension the way the
    /// roadmap density does.
    fn candidate_count(&self) -> usize {
        if self.space.dimension() == 3 {
            10
        } else {
            30
        }
    }

    /// Retrieve a piecewise-linear path from `start` to `goal`.
    pub fn retrieve(
        &mut self,
        graph: &mut SparseGraph<S>,
        start: &S::State,
        goal: &S::State,
        termination: &Termination,
    ) -> Result<Vec<S::State>, PlanningError> {
        if graph.is_empty() {
            debug!("retrieval on an empty roadmap");
            return Err(PlanningError::NoEntry("start"));
        }

        let k = self.candidate_count();
        let candidate_starts = graph.find_nearest_k(start, k, QUERY_THREAD);
        if candidate_starts.is_empty() {
            return Err(PlanningError::NoEntry("start"));
        }
        let candidate_goals = graph.find_nearest_k(goal, k, QUERY_THREAD);
        if candidate_goals.is_empty() {
            return Err(PlanningError::NoEntry("goal"));
        }
        debug!(
            "retrieval: {} start candidates, {} goal candidates",
            candidate_starts.len(),
            candidate_goals.len()
        );

        let mut path =
            self.get_path_on_graph(graph, &candidate_starts, &candidate_goals, start, goal, termination)?;

        if self.smoothing_enabled {
            let before = path.len();
            self.simplifier.simplify(self.space.as_ref(), &mut path, termination);
            debug!("smoothing reduced path from {} to {} states", before, path.len());
        }
        Ok(path)
    }

    /// Whether `state` can see any roadmap vertex at all. Callers use this
    /// to pre-validate queries.
    pub fn can_connect(&self, graph: &SparseGraph<S>, state: &S::State) -> bool {
        graph
            .find_nearest_k(state, self.candidate_count(), QUERY_THREAD)
            .into_iter()
            .any(|v| self.space.check_motion(state, graph.vertex_state(v)))
    }

    /// Try every visible (entry, exit) combination until one yields a
    /// collision-free graph path.
    fn get_path_on_graph(
        &mut self,
        graph: &mut SparseGraph<S>,
        candidate_starts: &[SparseVertex],
        candidate_goals: &[SparseVertex],
        start: &S::State,
        goal: &S::State,
        termination: &Termination,
    ) -> Result<Vec<S::State>, PlanningError> {
        let mut found_valid_start = false;
        let mut found_valid_goal = false;
        let mut connected_pair: Option<(SparseVertex, SparseVertex)> = None;

        for &entry in candidate_starts {
            // Entry visibility goes straight to the oracle: the query
            // endpoints are not store members.
            if !self.space.check_motion(start, graph.vertex_state(entry)) {
                continue;
            }
            found_valid_start = true;

            for &exit in candidate_goals {
                if termination.triggered() {
                    return Err(PlanningError::Timeout);
                }
                if !self.space.check_motion(goal, graph.vertex_state(exit)) {
                    continue;
                }
                found_valid_goal = true;
                connected_pair = connected_pair.or(Some((entry, exit)));

                if let Some(path) =
                    self.lazy_collision_search(graph, entry, exit, start, goal, termination)?
                {
                    return Ok(path);
                }
                debug!(
                    "no path via entry {} / exit {}, trying other combinations",
                    entry.0, exit.0
                );
            }
        }

        match (found_valid_start, found_valid_goal) {
            (true, true) => {
                // Entry and exit both exist; the roadmap itself cannot
                // join them. Report without mutating anything.
                let (entry, exit) = connected_pair.expect("recorded on first valid pair");
                Err(PlanningError::Disconnected { start: entry, goal: exit })
            }
            (true, false) => Err(PlanningError::NoEntry("goal")),
            _ => Err(PlanningError::NoEntry("start")),
        }
    }

    /// A* between one entry/exit pair, lazily validating edges and
    /// re-searching after each disabled edge.
    fn lazy_collision_search(
        &mut self,
        graph: &mut SparseGraph<S>,
        entry: SparseVertex,
        exit: SparseVertex,
        start: &S::State,
        goal: &S::State,
        termination: &Termination,
    ) -> Result<Option<Vec<S::State>>, PlanningError> {
        // Entry and exit collapsed to one vertex: trivial solution.
        if entry == exit {
            return Ok(Some(self.vertex_path_to_state_path(graph, &[entry], start, goal)));
        }

        if !graph.same_component(entry, exit) {
            debug!("entry {} and exit {} lie in different components", entry.0, exit.0);
            return Ok(None);
        }

        loop {
            if termination.triggered() {
                return Err(PlanningError::Timeout);
            }

            match graph.astar_search(entry, exit, termination)? {
                AstarResult::Exhausted => return Ok(None),
                AstarResult::Found { path, cost } => {
                    debug!("A* found {} vertices, weight {:.4}", path.len(), cost);
                    if self.lazy_collision_check(graph, &path, termination)? {
                        return Ok(Some(self.vertex_path_to_state_path(graph, &path, start, goal)));
                    }
                    // Some edge got disabled; search again on the pruned
                    // graph.
                }
            }
        }
    }

    /// Validate every not-yet-checked edge on the path. Returns whether
    /// the whole path came back free.
    fn lazy_collision_check(
        &self,
        graph: &mut SparseGraph<S>,
        path: &[SparseVertex],
        termination: &Termination,
    ) -> Result<bool, PlanningError> {
        let mut has_invalid_edges = false;

        for window in path.windows(2) {
            if termination.triggered() {
                return Err(PlanningError::Timeout);
            }
            let (from, to) = (window[0], window[1]);
            let collision = graph
                .edge(from, to)
                .expect("searched path uses existing edges")
                .collision;

            match collision {
                EdgeCollisionState::NotChecked => {
                    let free = self
                        .space
                        .check_motion(graph.vertex_state(from), graph.vertex_state(to));
                    if free {
                        graph.mark_edge_collision(from, to, EdgeCollisionState::Free);
                    } else {
                        info!("disabling edge ({}, {}): motion in collision", from.0, to.0);
                        graph.mark_edge_collision(from, to, EdgeCollisionState::InCollision);
                        has_invalid_edges = true;
                    }
                }
                EdgeCollisionState::InCollision => has_invalid_edges = true,
                EdgeCollisionState::Free => {}
            }
        }
        Ok(!has_invalid_edges)
    }

    /// Convert a vertex path to a state path, stitching the caller's
    /// exact endpoints on where they differ from the boundary vertices.
    fn vertex_path_to_state_path(
        &self,
        graph: &SparseGraph<S>,
        vertex_path: &[SparseVertex],
        start: &S::State,
        goal: &S::State,
    ) -> Vec<S::State> {
        let mut states = Vec::with_capacity(vertex_path.len() + 2);

        let first = vertex_path[0];
        if !self.space.equal_states(start, graph.vertex_state(first)) {
            states.push(start.clone());
        }
        for &v in vertex_path {
            states.push(graph.vertex_state(v).clone());
        }
        let last = vertex_path[vertex_path.len() - 1];
        if !self.space.equal_states(goal, graph.vertex_state(last)) {
            states.push(goal.clone());
        }
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeType, VertexType};
    use crate::space::real_vector::{BoxRegion, RealVectorSpace};

    /// Unit square with a wall at x ∈ [0.45, 0.55], y ∈ [0, 0.8].
    fn walled_space() -> Arc<RealVectorSpace> {
        Arc::new(
            RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0])
                .with_obstacle(BoxRegion::new(vec![0.45, 0.0], vec![0.55, 0.8])),
        )
    }

    /// A -- B -- C -- D along the bottom (B-C crosses the wall), with a
    /// clean bypass B -- E -- C over the top.
    fn walled_graph(
        space: &Arc<RealVectorSpace>,
    ) -> (SparseGraph<RealVectorSpace>, [SparseVertex; 5]) {
        let mut graph = SparseGraph::new(space.clone(), 1);
        let a = graph.add_vertex_state(vec![0.05, 0.1], VertexType::Coverage);
        let b = graph.add_vertex_state(vec![0.2, 0.1], VertexType::Coverage);
        let c = graph.add_vertex_state(vec![0.8, 0.1], VertexType::Coverage);
        let d = graph.add_vertex_state(vec![0.95, 0.1], VertexType::Coverage);
        let e = graph.add_vertex_state(vec![0.5, 0.95], VertexType::Coverage);
        graph.add_edge(a, b, EdgeType::Connectivity).unwrap();
        graph.add_edge(b, c, EdgeType::Connectivity).unwrap();
        graph.add_edge(c, d, EdgeType::Connectivity).unwrap();
        graph.add_edge(b, e, EdgeType::Connectivity).unwrap();
        graph.add_edge(e, c, EdgeType::Connectivity).unwrap();
        (graph, [a, b, c, d, e])
    }

    #[test]
    fn empty_roadmap_reports_no_entry() {
        let space = walled_space();
        let mut graph = SparseGraph::new(space.clone(), 1);
        let mut retriever = PathRetriever::new(space);
        let result =
            retriever.retrieve(&mut graph, &vec![0.1, 0.1], &vec![0.9, 0.9], &Termination::never());
        assert!(matches!(result, Err(PlanningError::NoEntry("start"))));
    }

    #[test]
    fn lazy_check_disables_blocked_edge_and_reroutes() {
        let space = walled_space();
        let (mut graph, [a, b, c, d, e]) = walled_graph(&space);
        let mut retriever = PathRetriever::new(space.clone()).with_smoothing(false);

        let path = retriever
            .retrieve(&mut graph, &vec![0.05, 0.1], &vec![0.95, 0.1], &Termination::never())
            .unwrap();

        // The optimum used B-C first; the lazy check must have disabled it.
        assert_eq!(
            graph.edge(b, c).unwrap().collision,
            EdgeCollisionState::InCollision
        );
        // Final route detours over the top.
        assert!(path.contains(graph.vertex_state(e)));
        // Endpoints equal the boundary vertex states, so nothing is stitched.
        assert_eq!(path.first().unwrap(), graph.vertex_state(a));
        assert_eq!(path.last().unwrap(), graph.vertex_state(d));
        // Every surviving edge on the route is now verified free.
        for window in [a, b, e, c, d].windows(2) {
            assert_eq!(
                graph.edge(window[0], window[1]).unwrap().collision,
                EdgeCollisionState::Free
            );
        }
    }

    #[test]
    fn endpoints_are_stitched_when_they_differ() {
        let space = walled_space();
        let (mut graph, [a, _, _, d, _]) = walled_graph(&space);
        let mut retriever = PathRetriever::new(space.clone()).with_smoothing(false);

        let start = vec![0.05, 0.15];
        let goal = vec![0.95, 0.15];
        let path = retriever.retrieve(&mut graph, &start, &goal, &Termination::never()).unwrap();
        assert_eq!(path.first().unwrap(), &start);
        assert_eq!(path.last().unwrap(), &goal);
        assert_eq!(&path[1], graph.vertex_state(a));
        assert_eq!(&path[path.len() - 2], graph.vertex_state(d));
    }

    #[test]
    fn disconnected_components_are_reported_without_mutation() {
        // Full-height wall: each island is visible only from its own side.
        let space = Arc::new(
            RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0])
                .with_obstacle(BoxRegion::new(vec![0.4, 0.0], vec![0.6, 1.0])),
        );
        let mut graph = SparseGraph::new(space.clone(), 1);
        let a = graph.add_vertex_state(vec![0.1, 0.1], VertexType::Coverage);
        let b = graph.add_vertex_state(vec![0.2, 0.1], VertexType::Coverage);
        let c = graph.add_vertex_state(vec![0.8, 0.9], VertexType::Coverage);
        let d = graph.add_vertex_state(vec![0.9, 0.9], VertexType::Coverage);
        graph.add_edge(a, b, EdgeType::Connectivity).unwrap();
        graph.add_edge(c, d, EdgeType::Connectivity).unwrap();
        let edges_before = graph.edge_count();

        let mut retriever = PathRetriever::new(space);
        let result =
            retriever.retrieve(&mut graph, &vec![0.1, 0.12], &vec![0.9, 0.88], &Termination::never());
        assert!(matches!(result, Err(PlanningError::Disconnected { .. })));
        assert_eq!(graph.edge_count(), edges_before);
    }

    #[test]
    fn shared_entry_and_exit_yields_trivial_path() {
        let space = Arc::new(RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0]));
        let mut graph = SparseGraph::new(space.clone(), 1);
        let only = graph.add_vertex_state(vec![0.5, 0.5], VertexType::Coverage);

        let mut retriever = PathRetriever::new(space.clone()).with_smoothing(false);
        let start = vec![0.45, 0.5];
        let goal = vec![0.55, 0.5];
        let path = retriever.retrieve(&mut graph, &start, &goal, &Termination::never()).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(&path[0], &start);
        assert_eq!(&path[1], graph.vertex_state(only));
        assert_eq!(&path[2], &goal);
    }

    #[test]
    fn can_connect_probes_visibility() {
        let space = walled_space();
        let (graph, _) = walled_graph(&space);
        let retriever = PathRetriever::new(space);
        assert!(retriever.can_connect(&graph, &vec![0.1, 0.2]));
        // A state inside the wall has no valid motion to anything.
        assert!(!retriever.can_connect(&graph, &vec![0.5, 0.5]));
    }
}
