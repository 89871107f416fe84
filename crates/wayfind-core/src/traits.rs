use crate::types::Neighbor;

/// Opaque `text -> vector` provider.
///
/// Implementations must return vectors of exactly [`Embedder::dim`] floats, one
/// per input text, in input order.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_documents(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))
    }
}

/// Approximate top-k search over vectors addressed by their build position.
///
/// Results are ordered ascending by distance, ties broken by id.
pub trait VectorSearch: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn search(&self, query: &[f32], k: usize) -> crate::Result<Vec<Neighbor>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
