//! The ANN index: a [`ProximityGraph`] plus the parameters it was built with
//! and the traversal settings used to query it.
use serde::{Deserialize, Serialize};

use wayfind_core::config::{IndexSettings, SearchSettings};
use wayfind_core::traits::VectorSearch;
use wayfind_core::types::Neighbor;
use wayfind_core::{Error, Result};

use crate::distance::all_finite;
use crate::graph::build::build_graph;
use crate::graph::search::beam_search;
use crate::graph::ProximityGraph;

/// Graph construction parameters, recorded in `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphParams {
    /// Candidate list width before pruning.
    pub intermediate_graph_degree: usize,
    /// Out-degree of the final graph.
    pub graph_degree: usize,
    pub nn_descent_iterations: usize,
    /// Inputs up to this many vectors get exact candidate lists.
    pub exact_build_limit: usize,
    pub seed: u64,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            intermediate_graph_degree: 64,
            graph_degree: 32,
            nn_descent_iterations: 8,
            exact_build_limit: 4096,
            seed: 42,
        }
    }
}

impl From<&IndexSettings> for GraphParams {
    fn from(s: &IndexSettings) -> Self {
        Self {
            intermediate_graph_degree: s.intermediate_graph_degree,
            graph_degree: s.graph_degree,
            nn_descent_iterations: s.nn_descent_iterations,
            exact_build_limit: s.exact_build_limit,
            seed: s.seed,
        }
    }
}

impl GraphParams {
    pub fn validate(&self) -> Result<()> {
        if self.graph_degree == 0 {
            return Err(Error::InvalidConfig("graph_degree must be at least 1".into()));
        }
        if self.intermediate_graph_degree < self.graph_degree {
            return Err(Error::InvalidConfig(format!(
                "intermediate_graph_degree ({}) must be >= graph_degree ({})",
                self.intermediate_graph_degree, self.graph_degree
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Beam width; raised to `k` when smaller.
    pub itopk_size: usize,
    /// Traversal budget in expanded nodes.
    pub max_expansions: usize,
    pub num_seeds: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { itopk_size: 64, max_expansions: 4096, num_seeds: 4 }
    }
}

impl From<&SearchSettings> for SearchParams {
    fn from(s: &SearchSettings) -> Self {
        Self { itopk_size: s.itopk_size, max_expansions: s.max_expansions, num_seeds: s.num_seeds }
    }
}

#[derive(Debug, Clone)]
pub struct AnnIndex {
    graph: ProximityGraph,
    params: GraphParams,
    search: SearchParams,
}

impl AnnIndex {
    /// Build over `vectors`; vector ids are positions in the slice.
    pub fn build(dim: usize, vectors: &[Vec<f32>], params: GraphParams) -> Result<Self> {
        params.validate()?;
        if dim == 0 {
            return Err(Error::Data("dimension must be at least 1".into()));
        }
        if vectors.len() >= u32::MAX as usize {
            return Err(Error::Data(format!("{} vectors exceed the index capacity", vectors.len())));
        }
        let mut data = Vec::with_capacity(dim * vectors.len());
        for (row, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(Error::Data(format!("row {row} has {} values, expected {dim}", v.len())));
            }
            if !all_finite(v) {
                return Err(Error::Data(format!("row {row} contains a non-finite value")));
            }
            data.extend_from_slice(v);
        }
        let graph = build_graph(dim, data, &params);
        Ok(Self::from_graph(graph, params))
    }

    /// An index with no vectors; every search returns nothing.
    pub fn empty(dim: usize) -> Self {
        Self::from_graph(ProximityGraph::empty(dim), GraphParams::default())
    }

    pub(crate) fn from_graph(graph: ProximityGraph, params: GraphParams) -> Self {
        Self { graph, params, search: SearchParams::default() }
    }

    pub fn with_search_params(mut self, search: SearchParams) -> Self {
        self.search = search;
        self
    }

    pub fn dim(&self) -> usize { self.graph.dim() }
    pub fn len(&self) -> usize { self.graph.len() }
    pub fn is_empty(&self) -> bool { self.graph.is_empty() }
    pub fn params(&self) -> &GraphParams { &self.params }
    pub fn search_params(&self) -> &SearchParams { &self.search }
    pub fn graph(&self) -> &ProximityGraph { &self.graph }

    /// Top-`k` with this index's own [`SearchParams`].
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.search_with(query, k, &self.search)
    }

    /// Top-`k` ascending by `(distance, id)`. With `k >= len()` every vector is
    /// scored, so the result is exact.
    pub fn search_with(&self, query: &[f32], k: usize, params: &SearchParams) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim() {
            return Err(Error::Capacity { expected: self.dim(), actual: query.len() });
        }
        if !all_finite(query) {
            return Err(Error::Data("query contains a non-finite value".into()));
        }
        if k == 0 {
            return Err(Error::Data("k must be at least 1".into()));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let hits = if k >= self.len() { self.graph.scan(query) } else { beam_search(&self.graph, query, k, params) };
        Ok(hits.into_iter().map(|s| Neighbor { id: s.id as usize, distance: s.distance }).collect())
    }
}

impl VectorSearch for AnnIndex {
    fn dim(&self) -> usize { AnnIndex::dim(self) }
    fn len(&self) -> usize { AnnIndex::len(self) }
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> { AnnIndex::search(self, query, k) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_follow_settings() {
        let settings = IndexSettings { graph_degree: 8, seed: 7, ..IndexSettings::default() };
        let p = GraphParams::from(&settings);
        assert_eq!(p.graph_degree, 8);
        assert_eq!(p.seed, 7);
        assert_eq!(p.intermediate_graph_degree, 64);
        assert_eq!(SearchParams::from(&SearchSettings::default()), SearchParams::default());
    }

    #[test]
    fn invalid_params_rejected() {
        let v = vec![vec![0.0, 0.0]];
        let zero = GraphParams { graph_degree: 0, ..GraphParams::default() };
        assert!(matches!(AnnIndex::build(2, &v, zero), Err(Error::InvalidConfig(_))));
        let narrow = GraphParams { intermediate_graph_degree: 4, graph_degree: 8, ..GraphParams::default() };
        assert!(matches!(AnnIndex::build(2, &v, narrow), Err(Error::InvalidConfig(_))));
    }
}
