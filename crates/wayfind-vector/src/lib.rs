//! Graph-based approximate nearest-neighbour index over document embeddings,
//! the document store aligned with it, on-disk persistence and the query
//! service that serves filtered top-k lookups.
//!
//! Typical flow:
//! 1) Embed documents in batches and build an [`IndexedCorpus`] ([`pipeline`])
//! 2) Persist it with [`persist::save`]; reload with [`persist::load`]
//! 3) Publish it through a [`SearchService`] and answer [`SearchRequest`]s
pub mod corpus;
pub mod distance;
pub mod graph;
pub mod index;
pub mod persist;
pub mod pipeline;
pub mod retrieval;
pub mod service;
pub mod store;

pub use corpus::IndexedCorpus;
pub use index::{AnnIndex, GraphParams, SearchParams};
pub use persist::IndexMeta;
pub use retrieval::{Retriever, ScoredDocument};
pub use service::{Health, SearchRequest, SearchResponse, SearchService};
pub use store::DocumentStore;
