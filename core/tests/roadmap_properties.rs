//! Cross-cutting invariants checked over randomly grown roadmaps
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::sync::Arc;

use proptest::prelude::*;

use waymark_core::cache::MotionCache;
use waymark_core::config::PlannerConfig;
use waymark_core::construction::SparseCriteria;
use waymark_core::graph::SparseGraph;
use waymark_core::space::real_vector::{BoxRegion, RealVectorSpace, UniformClearanceSampler};
use waymark_core::space::{StateSpace, Termination};

fn obstacle_space() -> Arc<RealVectorSpace> {
    Arc::new(
        RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0])
            .with_obstacle(BoxRegion::new(vec![0.3, 0.3], vec![0.5, 0.5])),
    )
}

fn grown_graph(seed: u64) -> SparseGraph<RealVectorSpace> {
    let space = obstacle_space();
    let config = PlannerConfig {
        use_discretized_samples: false,
        sparse_delta_fraction: 0.3,
        dense_delta_fraction: 0.02,
        fourth_criteria_after_failures: 100,
        terminate_after_failures: 300,
        ..PlannerConfig::default()
    };
    let sampler = Box::new(UniformClearanceSampler::with_seed(space.clone(), seed));
    let mut criteria = SparseCriteria::new(space.clone(), config, sampler).unwrap();
    let mut graph = SparseGraph::new(space, 1);
    criteria.create_roadmap(&mut graph, None, &Termination::never()).unwrap();
    graph
}

#[test]
fn edges_imply_shared_components_and_metric_weights() {
    let mut graph = grown_graph(31);
    assert!(graph.live_vertex_count() > 0);

    let edges: Vec<_> = graph.edges_iter().map(|(pair, record)| (pair, record.weight)).collect();
    assert!(!edges.is_empty());
    for (pair, weight) in edges {
        assert!(graph.same_component(pair.first(), pair.second()));
        let distance = graph.distance_between(pair.first(), pair.second());
        assert!((weight - distance).abs() <= 1e-9 * distance.max(1.0));
    }
}

#[test]
fn compaction_leaves_no_tombstones_and_canonical_interfaces() {
    let mut graph = grown_graph(32);
    // Construction already compacts; a second sweep must be idempotent.
    let vertices_before = graph.live_vertex_count();
    let edges_before = graph.edge_count();
    graph.remove_deleted_vertices();
    assert_eq!(graph.live_vertex_count(), vertices_before);
    assert_eq!(graph.edge_count(), edges_before);

    for v in graph.live_vertices().collect::<Vec<_>>() {
        assert!(!graph.state_id(v).is_null());
        for pair in graph.interfaces(v).keys() {
            assert!(pair.first() < pair.second());
            assert!(graph.is_live(pair.first()));
            assert!(graph.is_live(pair.second()));
        }
    }
    graph.check_invariants().unwrap();
}

#[test]
fn coverage_admission_leaves_no_hole_behind() {
    let mut graph = grown_graph(33);
    let space = graph.space().clone();
    // Construction only terminates after a long run of samples that all
    // found a visible vertex nearby. Any valid probe therefore has a
    // vertex within two visibility radii: a sample next to the probe
    // either became a coverage vertex itself or saw one a radius away.
    let sparse_delta = 0.3 * space.max_extent();
    for i in 0..10 {
        for j in 0..10 {
            let probe = vec![0.05 + 0.1 * i as f64, 0.05 + 0.1 * j as f64];
            if !space.is_valid(&probe) {
                continue;
            }
            let neighbors = graph.find_neighbors_within(&probe, 2.0 * sparse_delta, 0);
            assert!(
                !neighbors.is_empty(),
                "probe {probe:?} has no roadmap neighbor within {}",
                2.0 * sparse_delta
            );
        }
    }
    graph.check_invariants().unwrap();
}

proptest! {
    #[test]
    fn cached_motion_checks_are_symmetric(
        points in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0), 2..12)
    ) {
        let space = obstacle_space();
        let mut cache = MotionCache::new(space, 2);
        let ids: Vec<_> = points.iter().map(|&(x, y)| cache.add_state(vec![x, y])).collect();

        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i..] {
                prop_assert_eq!(cache.check_motion(a, b, 0), cache.check_motion(b, a, 1));
            }
        }
    }

    #[test]
    fn cache_never_reaches_the_oracle_twice_per_pair(
        points in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0), 2..8),
        repeats in 1usize..4
    ) {
        let space = obstacle_space();
        let mut cache = MotionCache::new(space, 1);
        let ids: Vec<_> = points.iter().map(|&(x, y)| cache.add_state(vec![x, y])).collect();

        for _ in 0..=repeats {
            for (i, &a) in ids.iter().enumerate() {
                for &b in &ids[i + 1..] {
                    cache.check_motion(a, b, 0);
                }
            }
        }

        let pair_count = (ids.len() * (ids.len() - 1) / 2) as u64;
        let stats = cache.stats();
        prop_assert_eq!(cache.len() as u64, pair_count);
        // Only the first pass misses; all later passes hit the memo.
        prop_assert_eq!(stats.total_checks - stats.cached_checks, pair_count);
    }
}
