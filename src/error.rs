//! Error types for the retrieval core.

use thiserror::Error;

/// Failures that abort a retrieval call.
///
/// Resolution misses, per-note fetch failures and rewrite failures are
/// recovered inside the retriever and never surface here.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Retriever was configured with unusable options
    #[error("Invalid retrieval options: {0}")]
    InvalidOptions(String),

    /// Query could not be embedded
    #[error("Failed to embed query {query:?}")]
    Embedding {
        query: String,
        #[source]
        source: anyhow::Error,
    },

    /// Query vector does not match the index dimension
    #[error("Query embedding has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector index search failed
    #[error("Vector search failed")]
    Search {
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
