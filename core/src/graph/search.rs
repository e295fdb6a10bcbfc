//! A* search over the sparse roadmap
//!
//! Early-exit best-first search with the state-space metric as heuristic.
//! Edges carrying an in-collision verdict are treated as infinitely heavy
//! and never relaxed, which is what lets the retrieval engine re-run the
//! search after lazily disabling edges. "Goal reached" is a sum-type
//! result, not an unwound exception.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::PlanningError;
use crate::graph::{EdgeCollisionState, SparseGraph, SparseVertex};
use crate::space::{StateSpace, Termination};

/// Outcome of a roadmap search.
#[derive(Debug, Clone, PartialEq)]
pub enum AstarResult {
    /// Vertex path from start to goal, inclusive, with its total weight.
    Found { path: Vec<SparseVertex>, cost: f64 },
    /// The open set drained without reaching the goal.
    Exhausted,
}

/// Open-set entry ordered for a min-heap on f-score.
#[derive(Debug, Clone, Copy, PartialEq)]
struct QueueEntry {
    f_score: f64,
    g_score: f64,
    vertex: SparseVertex,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed comparison turns std's max-heap into a min-heap.
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.g_score.partial_cmp(&self.g_score).unwrap_or(Ordering::Equal))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S: StateSpace> SparseGraph<S> {
    /// Shortest path between two live vertices, honoring edge collision
    /// verdicts. Polls `termination` at each expansion.
    pub fn astar_search(
        &self,
        start: SparseVertex,
        goal: SparseVertex,
        termination: &Termination,
    ) -> Result<AstarResult, PlanningError> {
        if !self.is_live(start) || !self.is_live(goal) {
            return Err(PlanningError::NotFound(format!(
                "search endpoint {} or {} is not live",
                start.0, goal.0
            )));
        }
        if start == goal {
            return Ok(AstarResult::Found { path: vec![start], cost: 0.0 });
        }

        let mut open = BinaryHeap::new();
        let mut g_scores: HashMap<SparseVertex, f64> = HashMap::new();
        let mut came_from: HashMap<SparseVertex, SparseVertex> = HashMap::new();
        let mut closed: HashSet<SparseVertex> = HashSet::new();

        g_scores.insert(start, 0.0);
        open.push(QueueEntry {
            f_score: self.distance_between(start, goal),
            g_score: 0.0,
            vertex: start,
        });
        self.record_node_opened();

        while let Some(entry) = open.pop() {
            if termination.triggered() {
                return Err(PlanningError::Timeout);
            }
            let current = entry.vertex;
            if closed.contains(&current) {
                continue;
            }
            closed.insert(current);
            self.record_node_closed();

            if current == goal {
                let mut path = vec![goal];
                let mut cursor = goal;
                while let Some(&previous) = came_from.get(&cursor) {
                    path.push(previous);
                    cursor = previous;
                }
                path.reverse();
                return Ok(AstarResult::Found { path, cost: entry.g_score });
            }

            for &neighbor in self.neighbors(current) {
                if closed.contains(&neighbor) || !self.is_live(neighbor) {
                    continue;
                }
                let edge = match self.edge(current, neighbor) {
                    Some(edge) => edge,
                    None => continue,
                };
                // Disabled edges carry infinite weight.
                if edge.collision == EdgeCollisionState::InCollision {
                    continue;
                }
                let tentative = entry.g_score + edge.weight;
                if tentative < *g_scores.get(&neighbor).unwrap_or(&f64::INFINITY) {
                    g_scores.insert(neighbor, tentative);
                    came_from.insert(neighbor, current);
                    open.push(QueueEntry {
                        f_score: tentative + self.distance_between(neighbor, goal),
                        g_score: tentative,
                        vertex: neighbor,
                    });
                    self.record_node_opened();
                }
            }
        }

        Ok(AstarResult::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeType, VertexType};
    use crate::space::real_vector::RealVectorSpace;
    use std::sync::Arc;

    fn grid_graph() -> (SparseGraph<RealVectorSpace>, Vec<SparseVertex>) {
        let space = Arc::new(RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0]));
        let mut graph = SparseGraph::new(space, 1);
        // 0 -(0.5)- 1 -(0.5)- 2  and a long bypass 0 -(0.9)- 3 -(0.9)- 2
        let v0 = graph.add_vertex_state(vec![0.0, 0.0], VertexType::Coverage);
        let v1 = graph.add_vertex_state(vec![0.5, 0.0], VertexType::Coverage);
        let v2 = graph.add_vertex_state(vec![1.0, 0.0], VertexType::Coverage);
        let v3 = graph.add_vertex_state(vec![0.5, 0.75], VertexType::Coverage);
        graph.add_edge(v0, v1, EdgeType::Connectivity).unwrap();
        graph.add_edge(v1, v2, EdgeType::Connectivity).unwrap();
        graph.add_edge(v0, v3, EdgeType::Connectivity).unwrap();
        graph.add_edge(v3, v2, EdgeType::Connectivity).unwrap();
        (graph, vec![v0, v1, v2, v3])
    }

    #[test]
    fn finds_the_short_route() {
        let (graph, v) = grid_graph();
        match graph.astar_search(v[0], v[2], &Termination::never()).unwrap() {
            AstarResult::Found { path, cost } => {
                assert_eq!(path, vec![v[0], v[1], v[2]]);
                assert!((cost - 1.0).abs() < 1e-12);
            }
            AstarResult::Exhausted => panic!("expected a path"),
        }
    }

    #[test]
    fn in_collision_edges_are_avoided() {
        let (mut graph, v) = grid_graph();
        graph.mark_edge_collision(v[0], v[1], EdgeCollisionState::InCollision);
        match graph.astar_search(v[0], v[2], &Termination::never()).unwrap() {
            AstarResult::Found { path, .. } => assert_eq!(path, vec![v[0], v[3], v[2]]),
            AstarResult::Exhausted => panic!("bypass should remain"),
        }
    }

    #[test]
    fn exhausts_on_disconnected_goal() {
        let (mut graph, v) = grid_graph();
        let island = graph.add_vertex_state(vec![0.9, 0.9], VertexType::Coverage);
        assert_eq!(
            graph.astar_search(v[0], island, &Termination::never()).unwrap(),
            AstarResult::Exhausted
        );
    }

    #[test]
    fn trivial_search_returns_single_vertex() {
        let (graph, v) = grid_graph();
        match graph.astar_search(v[1], v[1], &Termination::never()).unwrap() {
            AstarResult::Found { path, cost } => {
                assert_eq!(path, vec![v[1]]);
                assert_eq!(cost, 0.0);
            }
            AstarResult::Exhausted => panic!(),
        }
    }

    #[test]
    fn timeout_is_surfaced() {
        let (graph, v) = grid_graph();
        let result = graph.astar_search(v[0], v[2], &Termination::after(std::time::Duration::ZERO));
        assert!(matches!(result, Err(PlanningError::Timeout)));
    }
}
