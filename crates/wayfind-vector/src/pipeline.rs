//! Offline build: embed documents in batches, then build the corpus.
use indicatif::{ProgressBar, ProgressStyle};

use wayfind_core::traits::Embedder;
use wayfind_core::types::Document;
use wayfind_core::{Error, Result};

use crate::corpus::IndexedCorpus;
use crate::index::GraphParams;

/// Embed `texts` `batch_size` at a time, in order. Checks that the embedder
/// returns one vector of [`Embedder::dim`] floats per text.
pub fn embed_in_batches(embedder: &dyn Embedder, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
    if batch_size == 0 {
        return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
    }
    let dim = embedder.dim();
    let pb = ProgressBar::new(texts.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut vectors = Vec::with_capacity(texts.len());
    for (batch_no, batch) in texts.chunks(batch_size).enumerate() {
        let embedded = embedder
            .embed_documents(batch)
            .map_err(|e| Error::Embedding(format!("batch {batch_no}: {e:#}")))?;
        if embedded.len() != batch.len() {
            return Err(Error::Embedding(format!(
                "batch {batch_no}: embedder returned {} vectors for {} texts",
                embedded.len(),
                batch.len()
            )));
        }
        if let Some(bad) = embedded.iter().find(|v| v.len() != dim) {
            return Err(Error::Capacity { expected: dim, actual: bad.len() });
        }
        vectors.extend(embedded);
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("embedded");
    tracing::info!(documents = vectors.len(), dim, "embedding complete");
    Ok(vectors)
}

/// Embed every document's text and build an [`IndexedCorpus`] over them.
pub fn build_corpus(
    embedder: &dyn Embedder,
    documents: Vec<Document>,
    params: GraphParams,
    batch_size: usize,
) -> Result<IndexedCorpus> {
    let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
    let vectors = embed_in_batches(embedder, &texts, batch_size)?;
    tracing::info!(documents = documents.len(), "building index");
    IndexedCorpus::build(documents, &vectors, embedder.dim(), params)
}
