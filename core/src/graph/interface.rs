//! Interface bookkeeping records
//!
//! For a vertex `v` and an unordered pair of its neighbors `{vp, vpp}`,
//! the roadmap remembers the best witness pair discovered through each
//! neighbor's side of the shared interface. The pair key is always stored
//! canonically with the smaller vertex id first; accessor "1" is the
//! smaller-id neighbor's side and "2" the larger's.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use serde::{Deserialize, Serialize};

use crate::data_structures::StateId;
use crate::graph::SparseVertex;

/// Unordered vertex pair in canonical (min, max) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexPair {
    first: SparseVertex,
    second: SparseVertex,
}

impl VertexPair {
    pub fn new(a: SparseVertex, b: SparseVertex) -> Self {
        debug_assert_ne!(a, b, "interface pair must join distinct vertices");
        if a < b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> SparseVertex {
        self.first
    }

    pub fn second(&self) -> SparseVertex {
        self.second
    }

    pub fn contains(&self, v: SparseVertex) -> bool {
        self.first == v || self.second == v
    }
}

/// A witness pair supporting one side of an interface: `inside` sits in
/// the owning vertex's visibility region, `outside` just across it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfacePoints {
    pub inside: StateId,
    pub outside: StateId,
}

/// Witness bookkeeping for one (vertex, neighbor-pair) entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceData {
    interface1: Option<InterfacePoints>,
    interface2: Option<InterfacePoints>,
    /// Distance between the two inside witnesses; infinite until both
    /// sides are populated.
    last_distance: f64,
}

impl Default for InterfaceData {
    fn default() -> Self {
        Self { interface1: None, interface2: None, last_distance: f64::INFINITY }
    }
}

impl InterfaceData {
    pub fn has_interface1(&self) -> bool {
        self.interface1.is_some()
    }

    pub fn has_interface2(&self) -> bool {
        self.interface2.is_some()
    }

    pub fn interface1(&self) -> Option<InterfacePoints> {
        self.interface1
    }

    pub fn interface2(&self) -> Option<InterfacePoints> {
        self.interface2
    }

    pub fn last_distance(&self) -> f64 {
        self.last_distance
    }

    /// Store the smaller-id neighbor's witness pair. `inside_distance`
    /// measures between inside witnesses when the opposite side exists.
    pub fn set_interface1(
        &mut self,
        points: InterfacePoints,
        inside_distance: impl FnOnce(StateId, StateId) -> f64,
    ) {
        self.interface1 = Some(points);
        self.last_distance = match self.interface2 {
            Some(other) => inside_distance(points.inside, other.inside),
            None => f64::INFINITY,
        };
    }

    /// Store the larger-id neighbor's witness pair.
    pub fn set_interface2(
        &mut self,
        points: InterfacePoints,
        inside_distance: impl FnOnce(StateId, StateId) -> f64,
    ) {
        self.interface2 = Some(points);
        self.last_distance = match self.interface1 {
            Some(other) => inside_distance(other.inside, points.inside),
            None => f64::INFINITY,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_canonicalizes_order() {
        let a = SparseVertex(7);
        let b = SparseVertex(3);
        let pair = VertexPair::new(a, b);
        assert_eq!(pair.first(), b);
        assert_eq!(pair.second(), a);
        assert_eq!(pair, VertexPair::new(b, a));
    }

    #[test]
    fn last_distance_requires_both_sides() {
        let mut data = InterfaceData::default();
        assert_eq!(data.last_distance(), f64::INFINITY);

        data.set_interface1(
            InterfacePoints { inside: StateId(1), outside: StateId(2) },
            |_, _| unreachable!("no opposite side yet"),
        );
        assert_eq!(data.last_distance(), f64::INFINITY);

        data.set_interface2(InterfacePoints { inside: StateId(3), outside: StateId(4) }, |a, b| {
            assert_eq!((a, b), (StateId(1), StateId(3)));
            0.25
        });
        assert_eq!(data.last_distance(), 0.25);
    }

    #[test]
    fn tightening_one_side_recomputes() {
        let mut data = InterfaceData::default();
        data.set_interface2(InterfacePoints { inside: StateId(3), outside: StateId(4) }, |_, _| 0.0);
        data.set_interface1(InterfacePoints { inside: StateId(1), outside: StateId(2) }, |_, _| 0.9);
        data.set_interface1(InterfacePoints { inside: StateId(5), outside: StateId(6) }, |_, _| 0.4);
        assert_eq!(data.last_distance(), 0.4);
        assert_eq!(data.interface1().unwrap().inside, StateId(5));
        assert_eq!(data.interface2().unwrap().outside, StateId(4));
    }
}
