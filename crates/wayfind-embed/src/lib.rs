//! Embedding providers for wayfind.
//!
//! The production model sits behind the [`Embedder`] trait and is supplied by
//! the caller. This crate ships the deterministic [`HashEmbedder`] used for
//! development, tests and offline index builds.
use anyhow::{bail, Result};
use std::hash::Hasher;
use twox_hash::XxHash64;

use wayfind_core::config::EmbeddingSettings;
pub use wayfind_core::traits::Embedder;

mod normalize;
mod tokenize;

pub use normalize::l2_normalize;
pub use tokenize::{features, tokenize};

/// Feature-hashing embedder: each token and adjacent-token pair is hashed
/// (xxHash64) to a signed bucket, then the vector is L2-normalised.
///
/// Texts sharing words land close together, which is enough to exercise
/// retrieval end to end without a model.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    seed: u64,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, seed: 0 } }

    pub fn with_seed(dim: usize, seed: u64) -> Self { Self { dim, seed } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (feature, weight) in features(text) {
            let mut hasher = XxHash64::with_seed(self.seed);
            hasher.write(feature.as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign * weight;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Build the embedder named by `settings.provider`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if settings.dimension == 0 { bail!("embedding dimension must be at least 1"); }
    match settings.provider.as_str() {
        "hash" => {
            tracing::info!(dim = settings.dimension, "using hash embedder");
            Ok(Box::new(HashEmbedder::new(settings.dimension)))
        }
        other => bail!("unknown embedding provider '{}'", other),
    }
}
