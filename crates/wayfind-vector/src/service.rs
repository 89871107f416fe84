//! Query service: the published corpus behind an atomic pointer, plus the
//! request/response types of the search surface.
//!
//! Readers take a snapshot per request without locking. Rebuilds and reloads
//! construct a fresh corpus off the async runtime and swap it in whole.
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

use wayfind_core::config::{EmbeddingSettings, SearchSettings, Settings};
use wayfind_core::traits::Embedder;
use wayfind_core::types::{Document, SearchResult};
use wayfind_core::{Error, Result};

use crate::corpus::IndexedCorpus;
use crate::index::{GraphParams, SearchParams};
use crate::pipeline;
use crate::retrieval::Retriever;

/// Exactly one of `query` (embedded by the service) or `vector` must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub vector: Option<Vec<f32>>,
    pub top_k: Option<usize>,
    pub category_filter: Option<String>,
}

impl SearchRequest {
    pub fn text(query: impl Into<String>) -> Self {
        Self { query: Some(query.into()), ..Self::default() }
    }

    pub fn vector(vector: Vec<f32>) -> Self {
        Self { vector: Some(vector), ..Self::default() }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_filter = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: Option<String>,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub loaded: bool,
    pub documents_indexed: usize,
}

pub struct SearchService {
    active: ArcSwapOption<IndexedCorpus>,
    embedder: Arc<dyn Embedder>,
    retriever: Retriever,
    search_params: SearchParams,
    default_top_k: usize,
    max_top_k: usize,
    batch_size: usize,
}

impl SearchService {
    pub fn new(embedder: Arc<dyn Embedder>, settings: &SearchSettings) -> Result<Self> {
        if settings.default_top_k == 0 || settings.default_top_k > settings.max_top_k {
            return Err(Error::InvalidConfig(format!(
                "default_top_k ({}) must be between 1 and max_top_k ({})",
                settings.default_top_k, settings.max_top_k
            )));
        }
        Ok(Self {
            active: ArcSwapOption::empty(),
            embedder,
            retriever: Retriever::new(settings.over_fetch_factor)?,
            search_params: SearchParams::from(settings),
            default_top_k: settings.default_top_k,
            max_top_k: settings.max_top_k,
            batch_size: EmbeddingSettings::default().batch_size,
        })
    }

    /// Service configured from the `[search]` and `[embedding]` tables.
    pub fn from_settings(embedder: Arc<dyn Embedder>, settings: &Settings) -> Result<Self> {
        Ok(Self::new(embedder, &settings.search)?.with_batch_size(settings.embedding.batch_size))
    }

    /// Batch size used when [`SearchService::rebuild`] embeds documents.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Swap `corpus` in as the active one. Its dimension must match the
    /// embedder's.
    pub fn publish(&self, corpus: IndexedCorpus) -> Result<()> {
        if corpus.dim() != self.embedder.dim() {
            return Err(Error::Capacity { expected: self.embedder.dim(), actual: corpus.dim() });
        }
        let documents = corpus.len();
        self.active.store(Some(Arc::new(corpus.with_search_params(self.search_params))));
        tracing::info!(documents, "published corpus");
        Ok(())
    }

    pub fn unload(&self) {
        self.active.store(None);
        tracing::info!("unloaded corpus");
    }

    /// Load a persisted corpus on the blocking pool and publish it. Returns
    /// the number of documents now served.
    pub async fn load_dir(&self, dir: impl Into<PathBuf>) -> Result<usize> {
        let dir = dir.into();
        let corpus = tokio::task::spawn_blocking(move || IndexedCorpus::load(&dir))
            .await
            .map_err(|e| Error::Operation(format!("load task failed: {e}")))??;
        let documents = corpus.len();
        self.publish(corpus)?;
        Ok(documents)
    }

    /// Embed and index `documents` on the blocking pool, then publish the
    /// result. The previous corpus keeps serving until the swap.
    pub async fn rebuild(&self, documents: Vec<Document>, params: GraphParams) -> Result<usize> {
        let embedder = Arc::clone(&self.embedder);
        let batch_size = self.batch_size;
        let corpus = tokio::task::spawn_blocking(move || {
            pipeline::build_corpus(embedder.as_ref(), documents, params, batch_size)
        })
        .await
        .map_err(|e| Error::Operation(format!("rebuild task failed: {e}")))??;
        let documents = corpus.len();
        self.publish(corpus)?;
        Ok(documents)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let corpus = self.active.load_full().ok_or(Error::NotLoaded)?;
        let vector = match (&request.query, &request.vector) {
            (Some(text), None) => self
                .embedder
                .embed_query(text)
                .map_err(|e| Error::Embedding(format!("{e:#}")))?,
            (None, Some(vector)) => vector.clone(),
            _ => return Err(Error::Data("exactly one of query or vector must be given".into())),
        };
        let top_k = self.effective_top_k(request.top_k);
        let hits = corpus.retrieve(&self.retriever, &vector, top_k, request.category_filter.as_deref())?;
        let results = hits.iter().map(|h| SearchResult::from_document(h.document, h.score)).collect();
        Ok(SearchResponse { query: request.query.clone(), results })
    }

    fn effective_top_k(&self, requested: Option<usize>) -> usize {
        match requested {
            None => self.default_top_k,
            Some(k) if k > self.max_top_k => {
                tracing::warn!(requested = k, max = self.max_top_k, "clamping top_k");
                self.max_top_k
            }
            Some(k) => k,
        }
    }

    pub fn categories(&self) -> Result<Vec<String>> {
        self.active.load_full().map(|c| c.categories()).ok_or(Error::NotLoaded)
    }

    pub fn health(&self) -> Health {
        match self.active.load_full() {
            Some(c) => Health { status: "healthy".into(), loaded: true, documents_indexed: c.len() },
            None => Health { status: "not_loaded".into(), loaded: false, documents_indexed: 0 },
        }
    }
}
