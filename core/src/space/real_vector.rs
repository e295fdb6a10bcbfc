//! Euclidean box world
//!
//! A bounded R^n configuration space with axis-aligned box obstacles. This
//! is the reference oracle the integration tests plan in, and a reasonable
//! starting point for holonomic robots; richer spaces implement the same
//! traits outside this crate.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PlanningError;
use crate::space::{StateCodec, StateSampler, StateSpace};

/// Axis-aligned box region used as an obstacle.
#[derive(Debug, Clone)]
pub struct BoxRegion {
    low: Vec<f64>,
    high: Vec<f64>,
}

impl BoxRegion {
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Self {
        assert_eq!(low.len(), high.len(), "box bounds must share a dimension");
        Self { low, high }
    }

    /// Whether the point lies inside the region (boundary inclusive).
    pub fn contains(&self, point: &[f64]) -> bool {
        point
            .iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .all(|(x, (lo, hi))| *x >= *lo && *x <= *hi)
    }

    /// Euclidean distance from a point to the region; zero inside it.
    pub fn distance_to(&self, point: &[f64]) -> f64 {
        let mut sum = 0.0;
        for (x, (lo, hi)) in point.iter().zip(self.low.iter().zip(self.high.iter())) {
            let d = if x < lo {
                lo - x
            } else if x > hi {
                x - hi
            } else {
                0.0
            };
            sum += d * d;
        }
        sum.sqrt()
    }
}

/// Bounded R^n space with box obstacles.
#[derive(Debug, Clone)]
pub struct RealVectorSpace {
    low: Vec<f64>,
    high: Vec<f64>,
    obstacles: Vec<BoxRegion>,
    /// Motion checks subdivide segments to at most this length.
    longest_valid_segment: f64,
}

impl RealVectorSpace {
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Self {
        assert_eq!(low.len(), high.len(), "bounds must share a dimension");
        assert!(low.iter().zip(high.iter()).all(|(lo, hi)| lo < hi), "bounds must be ordered");
        let extent: f64 = low
            .iter()
            .zip(high.iter())
            .map(|(lo, hi)| (hi - lo) * (hi - lo))
            .sum::<f64>()
            .sqrt();
        Self { low, high, obstacles: Vec::new(), longest_valid_segment: extent * 0.005 }
    }

    pub fn with_obstacle(mut self, region: BoxRegion) -> Self {
        self.obstacles.push(region);
        self
    }

    /// Override the motion-check subdivision length.
    pub fn with_resolution(mut self, longest_valid_segment: f64) -> Self {
        assert!(longest_valid_segment > 0.0);
        self.longest_valid_segment = longest_valid_segment;
        self
    }

    pub fn bounds(&self) -> (&[f64], &[f64]) {
        (&self.low, &self.high)
    }

    fn in_bounds(&self, point: &[f64]) -> bool {
        point
            .iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .all(|(x, (lo, hi))| *x >= *lo && *x <= *hi)
    }

    /// Distance to the nearest domain wall.
    fn boundary_clearance(&self, point: &[f64]) -> f64 {
        point
            .iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .map(|(x, (lo, hi))| (x - lo).min(hi - x))
            .fold(f64::INFINITY, f64::min)
    }
}

impl StateSpace for RealVectorSpace {
    type State = Vec<f64>;

    fn dimension(&self) -> usize {
        self.low.len()
    }

    fn max_extent(&self) -> f64 {
        self.low
            .iter()
            .zip(self.high.iter())
            .map(|(lo, hi)| (hi - lo) * (hi - lo))
            .sum::<f64>()
            .sqrt()
    }

    fn distance(&self, a: &Self::State, b: &Self::State) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
    }

    fn interpolate(&self, a: &Self::State, b: &Self::State, t: f64) -> Self::State {
        a.iter().zip(b.iter()).map(|(x, y)| x + (y - x) * t).collect()
    }

    fn equal_states(&self, a: &Self::State, b: &Self::State) -> bool {
        a == b
    }

    fn is_valid(&self, state: &Self::State) -> bool {
        self.in_bounds(state) && !self.obstacles.iter().any(|region| region.contains(state))
    }

    fn clearance(&self, state: &Self::State) -> f64 {
        let obstacle_clearance = self
            .obstacles
            .iter()
            .map(|region| region.distance_to(state))
            .fold(f64::INFINITY, f64::min);
        obstacle_clearance.min(self.boundary_clearance(state))
    }

    fn check_motion(&self, a: &Self::State, b: &Self::State) -> bool {
        if !self.is_valid(a) || !self.is_valid(b) {
            return false;
        }
        let length = self.distance(a, b);
        if length == 0.0 {
            return true;
        }
        let segments = (length / self.longest_valid_segment).ceil() as usize;
        for i in 1..segments {
            let t = i as f64 / segments as f64;
            if !self.is_valid(&self.interpolate(a, b, t)) {
                return false;
            }
        }
        true
    }
}

/// Uniform rejection sampler with an optional minimum-clearance constraint.
pub struct UniformClearanceSampler {
    space: std::sync::Arc<RealVectorSpace>,
    rng: StdRng,
    min_clearance: f64,
}

const MAX_SAMPLE_ATTEMPTS: usize = 1000;

impl UniformClearanceSampler {
    pub fn new(space: std::sync::Arc<RealVectorSpace>) -> Self {
        Self { space, rng: StdRng::from_entropy(), min_clearance: 0.0 }
    }

    /// Deterministic sampler for reproducible construction runs.
    pub fn with_seed(space: std::sync::Arc<RealVectorSpace>, seed: u64) -> Self {
        Self { space, rng: StdRng::seed_from_u64(seed), min_clearance: 0.0 }
    }

    fn uniform_point(&mut self) -> Vec<f64> {
        let (low, high) = (self.space.low.clone(), self.space.high.clone());
        low.iter().zip(high.iter()).map(|(lo, hi)| self.rng.gen_range(*lo..*hi)).collect()
    }
}

impl StateSampler<RealVectorSpace> for UniformClearanceSampler {
    fn sample(&mut self) -> Result<Vec<f64>, PlanningError> {
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let candidate = self.uniform_point();
            if self.space.is_valid(&candidate) && self.space.clearance(&candidate) >= self.min_clearance {
                return Ok(candidate);
            }
        }
        Err(PlanningError::OracleFailure(format!(
            "no valid sample with clearance {} after {} attempts",
            self.min_clearance, MAX_SAMPLE_ATTEMPTS
        )))
    }

    fn sample_near(&mut self, reference: &Vec<f64>, radius: f64) -> Result<Vec<f64>, PlanningError> {
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let candidate: Vec<f64> = reference
                .iter()
                .zip(self.space.low.iter().zip(self.space.high.iter()))
                .map(|(x, (lo, hi))| {
                    let span_lo = (x - radius).max(*lo);
                    let span_hi = (x + radius).min(*hi);
                    if span_lo < span_hi {
                        self.rng.gen_range(span_lo..span_hi)
                    } else {
                        span_lo
                    }
                })
                .collect();
            if self.space.is_valid(&candidate) {
                return Ok(candidate);
            }
        }
        Err(PlanningError::OracleFailure(format!(
            "no valid sample near reference within {} after {} attempts",
            radius, MAX_SAMPLE_ATTEMPTS
        )))
    }

    fn set_min_clearance(&mut self, clearance: f64) {
        self.min_clearance = clearance;
    }
}

/// Little-endian f64 layout, one lane per dimension.
#[derive(Debug, Clone, Copy)]
pub struct RealVectorCodec {
    dimension: usize,
}

impl RealVectorCodec {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl StateCodec<RealVectorSpace> for RealVectorCodec {
    fn state_size(&self) -> usize {
        self.dimension * std::mem::size_of::<f64>()
    }

    fn encode(&self, state: &Vec<f64>, buf: &mut [u8]) {
        debug_assert_eq!(state.len(), self.dimension);
        for (chunk, value) in buf.chunks_exact_mut(8).zip(state.iter()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
    }

    fn decode(&self, buf: &[u8]) -> Vec<f64> {
        buf.chunks_exact(8)
            .take(self.dimension)
            .map(|chunk| f64::from_le_bytes(chunk.try_into().expect("8-byte lane")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> RealVectorSpace {
        RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0])
    }

    #[test]
    fn distance_and_extent() {
        let space = unit_square();
        assert_relative_eq!(space.max_extent(), std::f64::consts::SQRT_2);
        assert_relative_eq!(space.distance(&vec![0.0, 0.0], &vec![1.0, 1.0]), std::f64::consts::SQRT_2);
    }

    #[test]
    fn obstacle_blocks_states_and_motions() {
        let space = unit_square()
            .with_obstacle(BoxRegion::new(vec![0.4, 0.0], vec![0.6, 0.8]));
        assert!(!space.is_valid(&vec![0.5, 0.5]));
        assert!(space.is_valid(&vec![0.5, 0.9]));
        assert!(!space.check_motion(&vec![0.1, 0.5], &vec![0.9, 0.5]));
        assert!(space.check_motion(&vec![0.1, 0.95], &vec![0.9, 0.95]));
    }

    #[test]
    fn clearance_measures_nearest_surface() {
        let space = unit_square()
            .with_obstacle(BoxRegion::new(vec![0.4, 0.4], vec![0.6, 0.6]));
        assert_relative_eq!(space.clearance(&vec![0.2, 0.5]), 0.2);
        assert_eq!(space.clearance(&vec![0.5, 0.5]), 0.0);
        // Near the domain wall the boundary dominates
        assert_relative_eq!(space.clearance(&vec![0.05, 0.5]), 0.05);
    }

    #[test]
    fn sampler_honors_clearance() {
        let space = std::sync::Arc::new(
            unit_square().with_obstacle(BoxRegion::new(vec![0.3, 0.3], vec![0.7, 0.7])),
        );
        let mut sampler = UniformClearanceSampler::with_seed(space.clone(), 7);
        sampler.set_min_clearance(0.05);
        for _ in 0..50 {
            let state = sampler.sample().unwrap();
            assert!(space.is_valid(&state));
            assert!(space.clearance(&state) >= 0.05);
        }
    }

    #[test]
    fn sample_near_stays_in_bounds() {
        let space = std::sync::Arc::new(unit_square());
        let mut sampler = UniformClearanceSampler::with_seed(space.clone(), 3);
        let reference = vec![0.02, 0.98];
        for _ in 0..50 {
            let state = sampler.sample_near(&reference, 0.1).unwrap();
            assert!(space.is_valid(&state));
        }
    }

    #[test]
    fn codec_round_trips() {
        let codec = RealVectorCodec::new(3);
        let state = vec![0.25, -1.5, 42.0];
        let mut buf = vec![0u8; codec.state_size()];
        codec.encode(&state, &mut buf);
        assert_eq!(codec.decode(&buf), state);
    }
}
