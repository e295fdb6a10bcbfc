//! Lattice seed generation
//!
//! Discretized seeding gives the roadmap complete coverage of the free
//! space before random growth begins. The generator is an external
//! collaborator from the construction engine's point of view; the grid
//! implementation here serves the shipped Euclidean box space.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::sync::Arc;

use log::debug;

use crate::space::real_vector::RealVectorSpace;
use crate::space::StateSpace;

/// Produces the initial lattice of seed states.
pub trait VertexDiscretizer<S: StateSpace> {
    /// Seed states spaced at the discretization step, already filtered
    /// for validity and clearance.
    fn generate_lattice(&self) -> Vec<S::State>;
}

/// Axis-aligned grid over a Euclidean box space.
pub struct GridLatticeDiscretizer {
    space: Arc<RealVectorSpace>,
    discretization: f64,
    min_clearance: f64,
}

impl GridLatticeDiscretizer {
    pub fn new(space: Arc<RealVectorSpace>, discretization: f64) -> Self {
        assert!(discretization > 0.0, "discretization step must be positive");
        Self { space, discretization, min_clearance: 0.0 }
    }

    pub fn with_min_clearance(mut self, min_clearance: f64) -> Self {
        self.min_clearance = min_clearance;
        self
    }

    pub fn discretization(&self) -> f64 {
        self.discretization
    }

    fn axis_values(&self, low: f64, high: f64) -> Vec<f64> {
        let mut values = Vec::new();
        let mut value = low;
        // Keep the far face of the box in the lattice despite rounding.
        let limit = high + self.discretization * 1e-9;
        while value <= limit {
            values.push(value.min(high));
            value += self.discretization;
        }
        values
    }
}

impl VertexDiscretizer<RealVectorSpace> for GridLatticeDiscretizer {
    fn generate_lattice(&self) -> Vec<Vec<f64>> {
        let (low, high) = self.space.bounds();
        let axes: Vec<Vec<f64>> =
            low.iter().zip(high.iter()).map(|(&lo, &hi)| self.axis_values(lo, hi)).collect();

        let mut seeds = Vec::new();
        let mut odometer = vec![0usize; axes.len()];
        'outer: loop {
            let state: Vec<f64> =
                odometer.iter().zip(axes.iter()).map(|(&i, axis)| axis[i]).collect();
            if self.space.is_valid(&state) && self.space.clearance(&state) >= self.min_clearance {
                seeds.push(state);
            }

            for axis in 0..axes.len() {
                odometer[axis] += 1;
                if odometer[axis] < axes[axis].len() {
                    continue 'outer;
                }
                odometer[axis] = 0;
            }
            break;
        }

        debug!(
            "generated {} lattice seeds at step {:.4} over {} axes",
            seeds.len(),
            self.discretization,
            axes.len()
        );
        seeds
    }
}
