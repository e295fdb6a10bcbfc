//! Piecewise-linear path simplification
//!
//! Shortcutting reducers used on retrieved paths and on candidate quality
//! paths before their intermediate states enter the roadmap.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::space::{StateSpace, Termination};

/// Reduces a piecewise-linear path in place.
pub trait PathSimplifier<S: StateSpace> {
    /// Opportunistic smoothing until the termination condition trips or
    /// the internal pass budget runs out.
    fn simplify(&mut self, space: &S, path: &mut Vec<S::State>, termination: &Termination);

    /// Remove interior vertices whose neighbors see each other directly,
    /// for at most `max_steps` passes.
    fn reduce_vertices(&mut self, space: &S, path: &mut Vec<S::State>, max_steps: usize);
}

/// Random-pair shortcutter.
pub struct ShortcutSimplifier {
    rng: StdRng,
    /// Shortcut attempts per simplify call.
    attempts: usize,
}

impl ShortcutSimplifier {
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy(), attempts: 100 }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), attempts: 100 }
    }
}

impl Default for ShortcutSimplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StateSpace> PathSimplifier<S> for ShortcutSimplifier {
    fn simplify(&mut self, space: &S, path: &mut Vec<S::State>, termination: &Termination) {
        for _ in 0..self.attempts {
            if termination.triggered() || path.len() < 3 {
                return;
            }
            let i = self.rng.gen_range(0..path.len() - 2);
            let j = self.rng.gen_range(i + 2..path.len());
            if space.check_motion(&path[i], &path[j]) {
                path.drain(i + 1..j);
            }
        }
    }

    fn reduce_vertices(&mut self, space: &S, path: &mut Vec<S::State>, max_steps: usize) {
        for _ in 0..max_steps {
            let mut removed_any = false;
            let mut i = 1;
            while i + 1 < path.len() {
                if space.check_motion(&path[i - 1], &path[i + 1]) {
                    path.remove(i);
                    removed_any = true;
                } else {
                    i += 1;
                }
            }
            if !removed_any {
                break;
            }
        }
    }
}

/// Whether the motion from `a` to `b` is valid with every interpolated
/// state at least `clearance` away from the nearest constraint boundary.
pub fn motion_with_clearance<S: StateSpace>(
    space: &S,
    a: &S::State,
    b: &S::State,
    clearance: f64,
) -> bool {
    if !space.check_motion(a, b) {
        return false;
    }
    if clearance <= 0.0 {
        return true;
    }
    let length = space.distance(a, b);
    if length == 0.0 {
        return space.clearance(a) >= clearance;
    }
    let step = (space.max_extent() * 0.01).min(length);
    let segments = (length / step).ceil() as usize;
    for i in 0..=segments {
        let t = i as f64 / segments as f64;
        if space.clearance(&space.interpolate(a, b, t)) < clearance {
            return false;
        }
    }
    true
}

/// Greedy clearance-respecting shortcutter: removes interior vertices
/// whenever their neighbors connect with the required clearance.
pub fn shortcut_with_clearance<S: StateSpace>(space: &S, path: &mut Vec<S::State>, clearance: f64) {
    let mut changed = true;
    while changed && path.len() > 2 {
        changed = false;
        let mut i = 1;
        while i + 1 < path.len() {
            if motion_with_clearance(space, &path[i - 1], &path[i + 1], clearance) {
                path.remove(i);
                changed = true;
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::real_vector::{BoxRegion, RealVectorSpace};

    fn corridor_space() -> RealVectorSpace {
        RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0])
            .with_obstacle(BoxRegion::new(vec![0.4, 0.0], vec![0.6, 0.7]))
    }

    #[test]
    fn reduce_vertices_drops_collinear_detours() {
        let space = RealVectorSpace::new(vec![0.0, 0.0], vec![1.0, 1.0]);
        let mut path = vec![
            vec![0.1, 0.1],
            vec![0.3, 0.3],
            vec![0.5, 0.5],
            vec![0.9, 0.9],
        ];
        let mut simplifier = ShortcutSimplifier::with_seed(1);
        simplifier.reduce_vertices(&space, &mut path, 10);
        assert_eq!(path.len(), 2);
        assert_eq!(path[0], vec![0.1, 0.1]);
        assert_eq!(path[1], vec![0.9, 0.9]);
    }

    #[test]
    fn simplify_keeps_obstacle_avoiding_waypoint() {
        let space = corridor_space();
        let mut path = vec![vec![0.1, 0.1], vec![0.5, 0.9], vec![0.9, 0.1]];
        let mut simplifier = ShortcutSimplifier::with_seed(2);
        simplifier.simplify(&space, &mut path, &Termination::never());
        // The direct segment crosses the wall, so the waypoint survives.
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn clearance_motion_rejects_grazing_segments() {
        let space = corridor_space();
        let a = vec![0.35, 0.85];
        let b = vec![0.65, 0.85];
        assert!(motion_with_clearance(&space, &a, &b, 0.0));
        // Passes 0.15 above the wall, so 0.2 clearance is unobtainable.
        assert!(!motion_with_clearance(&space, &a, &b, 0.2));
    }
}
