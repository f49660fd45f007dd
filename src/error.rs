use crate::chunking::Granularity;
use thiserror::Error;

/// Failure of an external capability (embedding service, vector store, language model).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("vector store error: {0}")]
    Qdrant(#[from] qdrant_client::QdrantError),
}

/// Errors surfaced by the retrieval pipeline.
///
/// `SourceRead`, `IndexBuild` and `Configuration` happen before any query is
/// served and abort startup. `Retrieval` and `Generation` fail a single query
/// and leave the built indices usable.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("failed to read source document {path}: {reason}")]
    SourceRead { path: String, reason: String },

    #[error("failed to build {granularity} index: {source}")]
    IndexBuild {
        granularity: Granularity,
        #[source]
        source: ProviderError,
    },

    #[error("retrieval failed: {0}")]
    Retrieval(#[source] ProviderError),

    #[error("generation failed: {0}")]
    Generation(#[source] ProviderError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to export answer to {path}: {reason}")]
    Export { path: String, reason: String },
}

pub type Result<T, E = RagError> = std::result::Result<T, E>;
