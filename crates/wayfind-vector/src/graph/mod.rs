//! Fixed-degree proximity graph: the flat dataset, one adjacency list per
//! node and a single entry point.
//!
//! - [`build`]: exact or NN-descent candidate lists, diversity pruning,
//!   reverse-edge merge, long-range edges and a connectivity pass
//! - [`search`]: best-first beam traversal under an expansion budget
//! - [`serialize`]: the `graph.bin` byte format
//! - `visited`: per-thread epoch-stamped visited set for search
use std::cmp::Ordering;

use crate::distance::squared_l2;

pub mod build;
pub mod search;
pub mod serialize;
mod visited;

/// A node id paired with its distance to some reference point.
///
/// Ordered by distance (total order), then by id, so sorts and heaps are
/// deterministic even with ties.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scored {
    pub distance: f32,
    pub id: u32,
}

impl Scored {
    pub fn new(id: usize, distance: f32) -> Self {
        Self { distance, id: id as u32 }
    }
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityGraph {
    dim: usize,
    data: Vec<f32>,
    adjacency: Vec<Vec<u32>>,
    entry_point: u32,
}

impl ProximityGraph {
    pub(crate) fn from_parts(dim: usize, data: Vec<f32>, adjacency: Vec<Vec<u32>>, entry_point: u32) -> Self {
        debug_assert_eq!(data.len(), dim * adjacency.len());
        Self { dim, data, adjacency, entry_point }
    }

    pub fn empty(dim: usize) -> Self {
        Self { dim, data: Vec::new(), adjacency: Vec::new(), entry_point: 0 }
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { self.adjacency.len() }

    pub fn is_empty(&self) -> bool { self.adjacency.is_empty() }

    /// Meaningless for an empty graph.
    pub fn entry_point(&self) -> usize { self.entry_point as usize }

    pub fn vector(&self, id: usize) -> &[f32] {
        &self.data[id * self.dim..(id + 1) * self.dim]
    }

    pub fn neighbors(&self, id: usize) -> &[u32] {
        &self.adjacency[id]
    }

    pub(crate) fn data(&self) -> &[f32] { &self.data }

    #[inline]
    pub(crate) fn distance_to(&self, query: &[f32], id: usize) -> f32 {
        squared_l2(query, self.vector(id))
    }

    #[inline]
    pub(crate) fn distance_between(&self, a: usize, b: usize) -> f32 {
        squared_l2(self.vector(a), self.vector(b))
    }

    /// Every node's distance to `query`, ascending by `(distance, id)`.
    pub(crate) fn scan(&self, query: &[f32]) -> Vec<Scored> {
        let mut all: Vec<Scored> = (0..self.len()).map(|id| Scored::new(id, self.distance_to(query, id))).collect();
        all.sort_unstable();
        all
    }
}
