//! Construction and retrieval around a bisecting obstacle
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::sync::Arc;

use waymark_core::config::PlannerConfig;
use waymark_core::construction::SparseCriteria;
use waymark_core::graph::SparseGraph;
use waymark_core::retrieval::PathRetriever;
use waymark_core::space::real_vector::{BoxRegion, RealVectorSpace, UniformClearanceSampler};
use waymark_core::space::{StateSpace, Termination};

/// Unit square bisected by a wall at x ∈ [0.45, 0.55] rising to y = 0.8;
/// the two halves connect only through the gap above it.
fn walled_space() -> Arc<RealVectorSpace> {
    Arc::new(
        RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0])
            .with_obstacle(BoxRegion::new(vec![0.45, 0.0], vec![0.55, 0.8])),
    )
}

fn walled_config() -> PlannerConfig {
    PlannerConfig {
        use_discretized_samples: false,
        sparse_delta_fraction: 0.3,
        dense_delta_fraction: 0.02,
        obstacle_clearance: 0.01,
        fourth_criteria_after_failures: 150,
        terminate_after_failures: 600,
        ..PlannerConfig::default()
    }
}

#[test]
fn both_sides_join_through_the_gap() {
    let space = walled_space();
    let sampler = Box::new(UniformClearanceSampler::with_seed(space.clone(), 21));
    let mut criteria = SparseCriteria::new(space.clone(), walled_config(), sampler).unwrap();
    let mut graph = SparseGraph::new(space.clone(), 1);

    criteria.create_roadmap(&mut graph, None, &Termination::never()).unwrap();

    assert!(graph.live_vertex_count() > 0);
    assert_eq!(graph.disjoint_set_count(), 1);
    graph.check_invariants().unwrap();

    let mut retriever = PathRetriever::new(space.clone());
    let start = vec![0.1, 0.1];
    let goal = vec![0.9, 0.1];
    let path = retriever.retrieve(&mut graph, &start, &goal, &Termination::never()).unwrap();

    assert_eq!(path.first().unwrap(), &start);
    assert_eq!(path.last().unwrap(), &goal);

    // Any route between the bottom corners must climb over the wall.
    let max_y = path.iter().map(|state| state[1]).fold(f64::NEG_INFINITY, f64::max);
    assert!(max_y > 0.8, "path never cleared the wall (max y = {max_y})");

    for window in path.windows(2) {
        assert!(space.check_motion(&window[0], &window[1]));
    }
}

#[test]
fn every_admitted_state_honors_the_clearance_floor() {
    let space = walled_space();
    let sampler = Box::new(UniformClearanceSampler::with_seed(space.clone(), 22));
    let mut criteria = SparseCriteria::new(space.clone(), walled_config(), sampler).unwrap();
    let mut graph = SparseGraph::new(space.clone(), 1);

    criteria.create_roadmap(&mut graph, None, &Termination::never()).unwrap();

    for v in graph.live_vertices().collect::<Vec<_>>() {
        let state = graph.vertex_state(v);
        assert!(space.is_valid(state));
        // Random candidates come from the clearance-constrained sampler;
        // quality-path intermediates are clearance-screened before
        // insertion. Nothing may sit closer to a surface than the floor.
        assert!(
            space.clearance(state) >= 0.01 - 1e-12,
            "vertex {} at {:?} has clearance {}",
            v.0,
            state,
            space.clearance(state)
        );
    }
}
