use thiserror::Error;

/// Failure kinds surfaced by the index, the store and the persistence layer.
///
/// None of these are retried internally: they describe bad input or corrupt
/// on-disk state, never a transient fault.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input vectors or request parameters.
    #[error("Invalid data: {0}")]
    Data(String),

    /// A vector id that does not name a stored document.
    #[error("Vector id {id} out of range for a store of {len} documents")]
    OutOfRange { id: usize, len: usize },

    /// Corrupt or incompatible persisted artifacts.
    #[error("Invalid index format: {0}")]
    Format(String),

    /// Document count and graph node count disagree.
    #[error("Index misaligned: {documents} documents for {nodes} graph nodes")]
    Alignment { documents: usize, nodes: usize },

    /// A vector whose length differs from the index dimension.
    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    Capacity { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No index loaded")]
    NotLoaded,

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
