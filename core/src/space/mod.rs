//! External collaborator interfaces
//!
//! The planner core is generic over the configuration space it plans in.
//! Everything it needs from the outside world (distances, interpolation,
//! validity, clearance, sampling, state serialization, debug drawing and
//! cooperative cancellation) enters through the traits in this module.
//! The core never inspects a state's representation.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

pub mod real_vector;
pub mod simplify;

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::PlanningError;
use crate::graph::{EdgeType, VertexType};

/// Configuration space and validity oracle.
///
/// `check_motion` is the expensive call; the planner memoizes it through
/// the motion cache and only reaches the oracle on a miss.
pub trait StateSpace: Send + Sync {
    /// An opaque configuration. Cloning must be cheap relative to a motion
    /// check; the planner clones freely when taking ownership of samples.
    type State: Clone + Debug;

    /// Number of degrees of freedom.
    fn dimension(&self) -> usize;

    /// Largest distance between any two states in the space.
    fn max_extent(&self) -> f64;

    /// Metric distance between two states.
    fn distance(&self, a: &Self::State, b: &Self::State) -> f64;

    /// State at parameter `t ∈ [0, 1]` along the motion from `a` to `b`.
    fn interpolate(&self, a: &Self::State, b: &Self::State, t: f64) -> Self::State;

    /// Exact state equality (not distance-epsilon equality).
    fn equal_states(&self, a: &Self::State, b: &Self::State) -> bool;

    /// Whether a single state satisfies all validity constraints.
    fn is_valid(&self, state: &Self::State) -> bool;

    /// Distance from `state` to the nearest constraint boundary.
    fn clearance(&self, state: &Self::State) -> f64;

    /// Whether the straight-line motion from `a` to `b` is entirely valid.
    fn check_motion(&self, a: &Self::State, b: &Self::State) -> bool;
}

/// Source of random valid states, optionally clearance-constrained.
pub trait StateSampler<S: StateSpace> {
    /// Draw a valid state, honoring the configured minimum clearance.
    /// Fails with [`PlanningError::OracleFailure`] once the internal
    /// attempt budget is exhausted.
    fn sample(&mut self) -> Result<S::State, PlanningError>;

    /// Draw a valid state within `radius` of `reference`. The clearance
    /// constraint does not apply here; callers filter as needed.
    fn sample_near(&mut self, reference: &S::State, radius: f64) -> Result<S::State, PlanningError>;

    /// Update the minimum obstacle clearance for subsequent `sample` calls.
    fn set_min_clearance(&mut self, clearance: f64);
}

/// Fixed-width byte layout for states, supplied by the caller when
/// persisting a roadmap. All states of one space encode to the same size.
pub trait StateCodec<S: StateSpace> {
    /// Encoded size in bytes, uniform across states.
    fn state_size(&self) -> usize;

    /// Write `state` into `buf`; `buf.len() == state_size()`.
    fn encode(&self, state: &S::State, buf: &mut [u8]);

    /// Reconstruct a state from `buf`; `buf.len() == state_size()`.
    fn decode(&self, buf: &[u8]) -> S::State;
}

/// Cooperative cancellation handle polled by long-running operations.
///
/// There are no suspension points anywhere in the planner; loops poll this
/// at iteration boundaries and unwind with [`PlanningError::Timeout`].
#[derive(Debug, Clone, Default)]
pub struct Termination {
    flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Termination {
    /// A condition that never triggers.
    pub fn never() -> Self {
        Self::default()
    }

    /// Trip when the shared flag becomes true.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag: Some(flag), deadline: None }
    }

    /// Trip once the given duration has elapsed.
    pub fn after(duration: Duration) -> Self {
        Self { flag: None, deadline: Some(Instant::now() + duration) }
    }

    /// Whether the operation should stop now.
    pub fn triggered(&self) -> bool {
        if let Some(flag) = &self.flag {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        false
    }
}

/// Debug-drawing sink. Every call is advisory; the planner behaves
/// identically under the null implementation.
pub trait RoadmapVisualizer<S: StateSpace>: Send + Sync {
    fn vertex_added(&self, _state: &S::State, _vertex_type: VertexType) {}
    fn vertex_removed(&self, _state: &S::State) {}
    fn edge_added(&self, _a: &S::State, _b: &S::State, _edge_type: EdgeType) {}
    fn candidate_rejected(&self, _state: &S::State) {}
    fn roadmap_updated(&self) {}
}

/// Visualizer that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVisualizer;

impl<S: StateSpace> RoadmapVisualizer<S> for NullVisualizer {}
