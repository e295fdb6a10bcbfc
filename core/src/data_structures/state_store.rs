//! State identifier store
//!
//! Owns every configuration referenced by roadmap vertices and interface
//! records, handing out dense integer ids. Id 0 is reserved as the
//! deleted/null sentinel so a zeroed vertex slot always reads as a
//! tombstone. Ids are never reused within a session.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use serde::{Deserialize, Serialize};

/// Dense integer handle to a stored state. Zero is the null id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub usize);

impl StateId {
    /// The reserved deleted/null id.
    pub const NULL: StateId = StateId(0);

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Append-only arena of owned states.
#[derive(Debug)]
pub struct StateStore<T> {
    /// Slot 0 stays empty so live ids start at 1.
    states: Vec<Option<T>>,
}

impl<T> StateStore<T> {
    pub fn new() -> Self {
        Self { states: vec![None] }
    }

    /// Takes ownership of `state` and returns its fresh id (≥ 1).
    pub fn add(&mut self, state: T) -> StateId {
        self.states.push(Some(state));
        StateId(self.states.len() - 1)
    }

    pub fn get(&self, id: StateId) -> Option<&T> {
        self.states.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: StateId) -> Option<&mut T> {
        self.states.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Resolve a live id. Callers hold the invariant that non-tombstone
    /// vertices always reference live states.
    pub fn state(&self, id: StateId) -> &T {
        self.get(id).expect("live state id")
    }

    /// Drop the state at `id`. Every vertex referencing it must already be
    /// tombstoned.
    pub fn free(&mut self, id: StateId) {
        if let Some(slot) = self.states.get_mut(id.0) {
            *slot = None;
        }
    }

    /// Number of live states.
    pub fn len(&self) -> usize {
        self.states.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live (id, state) pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (StateId, &T)> {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|state| (StateId(i), state)))
    }
}

impl<T> Default for StateStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
