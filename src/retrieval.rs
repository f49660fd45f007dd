use crate::chunking::TextUnit;
use crate::config::{parsed, var};
use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::index::Index;
use log::debug;
use std::sync::Arc;

const PAGE_SEPARATOR: &str = "\n---PAGE DOC---\n";
const CHUNK_SEPARATOR: &str = "\n---CHUNK DOC---\n";

/// How many units to fetch per index and the optional similarity floor
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Unset means the nearest units are always returned, however weak the match
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            top_k: 1,
            min_score: None,
        }
    }
}

impl RetrievalConfig {
    pub fn from_vars<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let top_k: usize = parsed(lookup, "RAG_TOP_K", 1)?;
        if top_k == 0 {
            return Err(RagError::Configuration(
                "RAG_TOP_K must be at least 1".to_string(),
            ));
        }

        let min_score = match var(lookup, "RAG_MIN_SCORE") {
            Some(raw) => Some(raw.parse::<f32>().map_err(|e| {
                RagError::Configuration(format!("invalid value for RAG_MIN_SCORE: {} ({})", raw, e))
            })?),
            None => None,
        };

        Ok(RetrievalConfig { top_k, min_score })
    }
}

/// Units fetched for one query, plus the strings shown and prompted with
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub page_units: Vec<TextUnit>,
    pub chunk_units: Vec<TextUnit>,
}

impl RetrievalResult {
    pub fn page_content(&self) -> String {
        join_content(&self.page_units, PAGE_SEPARATOR)
    }

    pub fn chunk_content(&self) -> String {
        join_content(&self.chunk_units, CHUNK_SEPARATOR)
    }

    /// Chunk content followed by page content
    pub fn content(&self) -> String {
        format!("{}\n\n{}", self.chunk_content(), self.page_content())
    }

    /// One `"<source> - Page <n>"` line per unit, pages first
    pub fn metadata(&self) -> String {
        self.units()
            .map(TextUnit::citation)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Page units followed by chunk units
    pub fn units(&self) -> impl Iterator<Item = &TextUnit> {
        self.page_units.iter().chain(self.chunk_units.iter())
    }
}

fn join_content(units: &[TextUnit], separator: &str) -> String {
    units
        .iter()
        .map(|unit| unit.content.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Embeds a query once and searches both indices with it
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Self {
        Retriever { embedder, config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Top-k units from each index using the configured k
    pub async fn retrieve(
        &self,
        query: &str,
        page_index: &Index,
        chunk_index: &Index,
    ) -> Result<RetrievalResult> {
        self.retrieve_k(query, page_index, chunk_index, self.config.top_k)
            .await
    }

    /// Independent nearest-neighbour search against each index
    pub async fn retrieve_k(
        &self,
        query: &str,
        page_index: &Index,
        chunk_index: &Index,
        k: usize,
    ) -> Result<RetrievalResult> {
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(RagError::Retrieval)?;

        let pages = page_index
            .search(&query_embedding, k, self.config.min_score)
            .await
            .map_err(RagError::Retrieval)?;
        let chunks = chunk_index
            .search(&query_embedding, k, self.config.min_score)
            .await
            .map_err(RagError::Retrieval)?;

        for hit in pages.iter().chain(chunks.iter()) {
            debug!(
                "Retrieved {} {} (score {:.3})",
                hit.unit.granularity,
                hit.unit.citation(),
                hit.score
            );
        }

        Ok(RetrievalResult {
            page_units: pages.into_iter().map(|hit| hit.unit).collect(),
            chunk_units: chunks.into_iter().map(|hit| hit.unit).collect(),
        })
    }
}
