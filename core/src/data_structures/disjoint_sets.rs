//! Union-find forest over vertex indices
//!
//! Tracks connected components of the roadmap. Union-find cannot split, so
//! the owner rebuilds the forest from the surviving edge set whenever edges
//! are removed.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

/// Disjoint-set forest with union by rank and path compression.
#[derive(Debug, Clone, Default)]
pub struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow the forest so `index` is a valid singleton element.
    pub fn ensure(&mut self, index: usize) {
        while self.parent.len() <= index {
            self.parent.push(self.parent.len());
            self.rank.push(0);
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        self.ensure(x);
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    pub fn same_set(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Number of distinct sets among the given elements.
    pub fn count_sets(&mut self, elements: impl Iterator<Item = usize>) -> usize {
        let mut roots: Vec<usize> = elements.map(|e| self.find(e)).collect();
        roots.sort_unstable();
        roots.dedup();
        roots.len()
    }

    /// Reset every element to a singleton.
    pub fn reset(&mut self, len: usize) {
        self.parent.clear();
        self.rank.clear();
        self.parent.extend(0..len);
        self.rank.resize(len, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_merges_and_find_compresses() {
        let mut sets = DisjointSets::new();
        sets.reset(6);
        sets.union(0, 1);
        sets.union(1, 2);
        sets.union(4, 5);
        assert!(sets.same_set(0, 2));
        assert!(!sets.same_set(0, 4));
        assert_eq!(sets.count_sets(0..6), 3);
    }

    #[test]
    fn connectivity_union_reduces_count_by_components_joined() {
        let mut sets = DisjointSets::new();
        sets.reset(5);
        // Three components {0,1}, {2}, {3,4}; joining all through 2.
        sets.union(0, 1);
        sets.union(3, 4);
        let before = sets.count_sets(0..5);
        sets.union(2, 0);
        sets.union(2, 3);
        assert_eq!(sets.count_sets(0..5), before - 2);
    }

    #[test]
    fn reset_restores_singletons() {
        let mut sets = DisjointSets::new();
        sets.reset(4);
        sets.union(0, 3);
        sets.reset(4);
        assert_eq!(sets.count_sets(0..4), 4);
    }
}
