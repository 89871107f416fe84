use std::path::Path;

use wayfind_core::types::Document;
use wayfind_core::{Error, Result};

use crate::index::{AnnIndex, GraphParams, SearchParams};
use crate::persist::{self, IndexMeta};
use crate::retrieval::{Retriever, ScoredDocument};
use crate::store::DocumentStore;

/// An index and the document store it was built with, guaranteed to hold the
/// same number of entries. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct IndexedCorpus {
    index: AnnIndex,
    store: DocumentStore,
}

impl IndexedCorpus {
    pub fn from_parts(index: AnnIndex, store: DocumentStore) -> Result<Self> {
        if index.len() != store.len() {
            return Err(Error::Alignment { documents: store.len(), nodes: index.len() });
        }
        Ok(Self { index, store })
    }

    /// Build the index over `vectors`; `vectors[i]` must embed `documents[i]`.
    pub fn build(documents: Vec<Document>, vectors: &[Vec<f32>], dim: usize, params: GraphParams) -> Result<Self> {
        if documents.len() != vectors.len() {
            return Err(Error::Alignment { documents: documents.len(), nodes: vectors.len() });
        }
        let store = DocumentStore::from_documents(documents)?;
        let index = AnnIndex::build(dim, vectors, params)?;
        Self::from_parts(index, store)
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let (index, store) = persist::load(dir)?;
        Self::from_parts(index, store)
    }

    pub fn save(&self, dir: &Path) -> Result<IndexMeta> {
        persist::save(&self.index, &self.store, dir)
    }

    pub fn with_search_params(self, params: SearchParams) -> Self {
        Self { index: self.index.with_search_params(params), store: self.store }
    }

    pub fn index(&self) -> &AnnIndex { &self.index }
    pub fn store(&self) -> &DocumentStore { &self.store }
    pub fn len(&self) -> usize { self.store.len() }
    pub fn is_empty(&self) -> bool { self.store.is_empty() }
    pub fn dim(&self) -> usize { self.index.dim() }
    pub fn categories(&self) -> Vec<String> { self.store.categories() }

    pub fn retrieve(
        &self,
        retriever: &Retriever,
        query: &[f32],
        k: usize,
        category: Option<&str>,
    ) -> Result<Vec<ScoredDocument<'_>>> {
        retriever.retrieve(&self.index, &self.store, query, k, category)
    }
}
