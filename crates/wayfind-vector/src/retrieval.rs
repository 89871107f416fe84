//! Two-stage retrieval: over-fetch from the index, then post-filter by
//! category and truncate.
use wayfind_core::traits::VectorSearch;
use wayfind_core::types::Document;
use wayfind_core::{Error, Result};

use crate::store::DocumentStore;

pub const DEFAULT_OVER_FETCH_FACTOR: usize = 2;

/// A resolved hit: the document, its vector id and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDocument<'a> {
    pub vector_id: usize,
    pub score: f32,
    pub document: &'a Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retriever {
    over_fetch_factor: usize,
}

impl Default for Retriever {
    fn default() -> Self {
        Self { over_fetch_factor: DEFAULT_OVER_FETCH_FACTOR }
    }
}

impl Retriever {
    pub fn new(over_fetch_factor: usize) -> Result<Self> {
        if over_fetch_factor == 0 {
            return Err(Error::InvalidConfig("over_fetch_factor must be at least 1".into()));
        }
        Ok(Self { over_fetch_factor })
    }

    pub fn over_fetch_factor(&self) -> usize { self.over_fetch_factor }

    /// Ask `index` for `requested_k * over_fetch_factor` candidates, keep those
    /// in `category` (when given) and return the first `requested_k`, in index
    /// order.
    ///
    /// A rare category can come back with fewer than `requested_k` hits; the
    /// index is not re-queried.
    pub fn retrieve<'a, I>(
        &self,
        index: &I,
        store: &'a DocumentStore,
        query: &[f32],
        requested_k: usize,
        category: Option<&str>,
    ) -> Result<Vec<ScoredDocument<'a>>>
    where
        I: VectorSearch + ?Sized,
    {
        if requested_k == 0 {
            return Err(Error::Data("requested_k must be at least 1".into()));
        }
        let fetch = requested_k.saturating_mul(self.over_fetch_factor);
        let candidates = index.search(query, fetch)?;
        let mut out = Vec::with_capacity(requested_k);
        for hit in candidates {
            let document = store.resolve(hit.id)?;
            if category.is_some_and(|c| document.category != c) {
                continue;
            }
            out.push(ScoredDocument { vector_id: hit.id, score: hit.distance, document });
            if out.len() == requested_k {
                break;
            }
        }
        Ok(out)
    }
}
