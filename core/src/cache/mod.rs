//! Dense motion-validity cache
//!
//! Memoizes the expensive straight-line motion check between pairs of
//! stored states. A verdict, once computed, never changes for the life of
//! the session: the validity oracle is assumed pure while a roadmap is
//! being built or queried. The memo map takes concurrent readers with
//! serialized writers, and bookkeeping is partitioned by worker thread so
//! a future parallel construction pass needs no redesign here.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::data_structures::{StateId, StateStore};
use crate::space::StateSpace;

/// Per-thread check accounting.
#[derive(Debug, Default)]
struct ThreadCounters {
    total_checks: AtomicU64,
    cache_hits: AtomicU64,
}

/// Snapshot of the cache's accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub total_checks: u64,
    pub cached_checks: u64,
}

impl CacheStats {
    pub fn percent_cached(&self) -> f64 {
        if self.total_checks == 0 {
            0.0
        } else {
            self.cached_checks as f64 / self.total_checks as f64 * 100.0
        }
    }
}

/// Motion-validity memo keyed by unordered state-id pairs. Owns the state
/// store so every cached verdict refers to states that outlive it.
pub struct MotionCache<S: StateSpace> {
    space: Arc<S>,
    store: StateStore<S::State>,
    verdicts: RwLock<HashMap<(StateId, StateId), bool>>,
    threads: Vec<ThreadCounters>,
}

impl<S: StateSpace> MotionCache<S> {
    pub fn new(space: Arc<S>, num_threads: usize) -> Self {
        let threads = (0..num_threads.max(1)).map(|_| ThreadCounters::default()).collect();
        Self { space, store: StateStore::new(), verdicts: RwLock::new(HashMap::new()), threads }
    }

    pub fn space(&self) -> &Arc<S> {
        &self.space
    }

    /// Take ownership of a state, assigning its id.
    pub fn add_state(&mut self, state: S::State) -> StateId {
        self.store.add(state)
    }

    pub fn store(&self) -> &StateStore<S::State> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StateStore<S::State> {
        &mut self.store
    }

    /// Resolve a live state id.
    pub fn state(&self, id: StateId) -> &S::State {
        self.store.state(id)
    }

    fn key(a: StateId, b: StateId) -> (StateId, StateId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Cached motion check between two stored states. Identical ids are
    /// trivially connected and never reach the oracle.
    pub fn check_motion(&self, a: StateId, b: StateId, thread_id: usize) -> bool {
        if a == b {
            return true;
        }
        let counters = &self.threads[thread_id];
        counters.total_checks.fetch_add(1, Ordering::Relaxed);

        let key = Self::key(a, b);
        if let Some(&free) = self.verdicts.read().get(&key) {
            counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            return free;
        }

        let free = self.space.check_motion(self.store.state(a), self.store.state(b));
        self.verdicts.write().insert(key, free);
        free
    }

    /// Seed a verdict without consulting the oracle (persistence load).
    pub fn insert_verdict(&self, a: StateId, b: StateId, free: bool) {
        if a != b {
            self.verdicts.write().insert(Self::key(a, b), free);
        }
    }

    /// Number of memoized pairs.
    pub fn len(&self) -> usize {
        self.verdicts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.read().is_empty()
    }

    /// Memo contents in canonical key order (persistence save).
    pub fn entries(&self) -> Vec<(StateId, StateId, bool)> {
        let mut entries: Vec<_> =
            self.verdicts.read().iter().map(|(&(a, b), &free)| (a, b, free)).collect();
        entries.sort_unstable_by_key(|&(a, b, _)| (a, b));
        entries
    }

    /// Accounting summed across worker threads.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for counters in &self.threads {
            stats.total_checks += counters.total_checks.load(Ordering::Relaxed);
            stats.cached_checks += counters.cache_hits.load(Ordering::Relaxed);
        }
        stats
    }

    /// Accounting for one worker thread.
    pub fn thread_stats(&self, thread_id: usize) -> CacheStats {
        let counters = &self.threads[thread_id];
        CacheStats {
            total_checks: counters.total_checks.load(Ordering::Relaxed),
            cached_checks: counters.cache_hits.load(Ordering::Relaxed),
        }
    }

    pub fn reset_counters(&self) {
        for counters in &self.threads {
            counters.total_checks.store(0, Ordering::Relaxed);
            counters.cache_hits.store(0, Ordering::Relaxed);
        }
    }
}
