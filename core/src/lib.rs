//! Waymark: experience-based motion planning over a sparse roadmap
//!
//! The core maintains a two-layer experience database for path planning
//! in continuous configuration spaces: a *sparse* roadmap built by four
//! geometric admissibility criteria (coverage, connectivity, interface,
//! quality) that keep it near-optimal under a spanner stretch bound, and
//! a *dense* motion-validity cache that amortizes the expensive collision
//! checks feeding those criteria. Queries retrieve piecewise-linear paths
//! by locating visible entry and exit vertices and running a lazily
//! collision-checked A* over the roadmap.
//!
//! The configuration space itself is a collaborator: implement
//! [`space::StateSpace`] (and friends) to plan in your own space, or use
//! the shipped Euclidean box world in [`space::real_vector`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use waymark_core::config::PlannerConfig;
//! use waymark_core::construction::{GridLatticeDiscretizer, SparseCriteria};
//! use waymark_core::graph::SparseGraph;
//! use waymark_core::retrieval::PathRetriever;
//! use waymark_core::space::real_vector::{RealVectorSpace, UniformClearanceSampler};
//! use waymark_core::space::Termination;
//!
//! let space = Arc::new(RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0]));
//! let config = PlannerConfig::default();
//! let sampler = Box::new(UniformClearanceSampler::new(space.clone()));
//! let mut criteria = SparseCriteria::new(space.clone(), config, sampler).unwrap();
//! let discretizer = GridLatticeDiscretizer::new(space.clone(), criteria.discretization());
//!
//! let mut graph = SparseGraph::new(space.clone(), 1);
//! criteria
//!     .create_roadmap(&mut graph, Some(&discretizer), &Termination::never())
//!     .unwrap();
//!
//! let mut retriever = PathRetriever::new(space);
//! let path = retriever
//!     .retrieve(&mut graph, &vec![0.1, 0.1], &vec![0.9, 0.9], &Termination::never())
//!     .unwrap();
//! assert!(path.len() >= 2);
//! ```
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

pub mod cache;
pub mod config;
pub mod construction;
pub mod data_structures;
pub mod error;
pub mod graph;
pub mod retrieval;
pub mod space;
pub mod storage;

pub use crate::cache::MotionCache;
pub use crate::config::PlannerConfig;
pub use crate::construction::SparseCriteria;
pub use crate::data_structures::{StateId, StateStore};
pub use crate::error::PlanningError;
pub use crate::graph::{
    AstarResult, EdgeCollisionState, EdgeType, SparseGraph, SparseVertex, VertexType,
};
pub use crate::retrieval::PathRetriever;
pub use crate::space::{StateSampler, StateSpace, Termination};
pub use crate::storage::RoadmapStorage;
