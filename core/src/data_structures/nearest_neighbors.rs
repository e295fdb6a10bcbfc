//! Nearest-neighbor index over roadmap vertices
//!
//! Membership index with radius and k-nearest queries. Distances come from
//! a caller-supplied callback so the index never touches state storage; the
//! graph resolves vertex ids (including its reserved query slots) itself.
//! A linear scan keeps semantics exact for the roadmap sizes the sparse
//! criteria produce; the interface leaves room for a metric tree later.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

/// Index of vertex ids supporting proximity queries.
#[derive(Debug, Clone, Default)]
pub struct NearestNeighborIndex {
    members: Vec<usize>,
}

impl NearestNeighborIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: usize) {
        debug_assert!(!self.members.contains(&id), "duplicate index member");
        self.members.push(id);
    }

    pub fn remove(&mut self, id: usize) {
        if let Some(pos) = self.members.iter().position(|&m| m == id) {
            self.members.swap_remove(pos);
        }
    }

    pub fn contains(&self, id: usize) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    /// Members within `radius`, closest first. Ties break on id so query
    /// results are deterministic.
    pub fn nearest_within(&self, radius: f64, distance: impl Fn(usize) -> f64) -> Vec<usize> {
        let mut hits: Vec<(f64, usize)> = self
            .members
            .iter()
            .filter_map(|&id| {
                let d = distance(id);
                (d <= radius).then_some((d, id))
            })
            .collect();
        hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// The `k` closest members, closest first.
    pub fn nearest_k(&self, k: usize, distance: impl Fn(usize) -> f64) -> Vec<usize> {
        let mut hits: Vec<(f64, usize)> = self.members.iter().map(|&id| (distance(id), id)).collect();
        hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));
        hits.truncate(k);
        hits.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_distance(points: &[f64]) -> impl Fn(usize) -> f64 + '_ {
        move |id| points[id].abs()
    }

    #[test]
    fn radius_query_sorts_and_filters() {
        let points = [0.9, 0.1, 0.5, 2.0];
        let mut index = NearestNeighborIndex::new();
        for id in 0..points.len() {
            index.add(id);
        }
        let hits = index.nearest_within(1.0, line_distance(&points));
        assert_eq!(hits, vec![1, 2, 0]);
    }

    #[test]
    fn k_query_truncates() {
        let points = [0.9, 0.1, 0.5, 2.0];
        let mut index = NearestNeighborIndex::new();
        for id in 0..points.len() {
            index.add(id);
        }
        assert_eq!(index.nearest_k(2, line_distance(&points)), vec![1, 2]);
    }

    #[test]
    fn removal_drops_member() {
        let points = [0.9, 0.1, 0.5];
        let mut index = NearestNeighborIndex::new();
        for id in 0..points.len() {
            index.add(id);
        }
        index.remove(1);
        assert!(!index.contains(1));
        assert_eq!(index.nearest_within(1.0, line_distance(&points)), vec![2, 0]);
    }

    #[test]
    fn equal_distances_break_ties_by_id() {
        let points = [0.5, 0.5, 0.5];
        let mut index = NearestNeighborIndex::new();
        index.add(2);
        index.add(0);
        index.add(1);
        assert_eq!(index.nearest_within(1.0, line_distance(&points)), vec![0, 1, 2]);
    }
}
