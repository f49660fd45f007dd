use crate::chunking::{Granularity, SplitOutput, TextUnit};
use crate::database::{collection_name, ScoredUnit, StoredPoint, VectorStore};
use crate::embeddings::{Embedder, Embedding};
use crate::error::{ProviderError, RagError, Result};
use log::{debug, info};
use std::sync::Arc;

/// A searchable collection of embedded units of one granularity
///
/// Read-only once built.
#[derive(Clone)]
pub struct Index {
    granularity: Granularity,
    collection: String,
    len: usize,
    store: Arc<dyn VectorStore>,
}

impl Index {
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nearest units to an already embedded query
    pub async fn search(
        &self,
        query: &Embedding,
        k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredUnit>, ProviderError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.store
            .search(&self.collection, query, k as u64, min_score)
            .await
    }
}

/// Page index and chunk index built from the same document
#[derive(Clone)]
pub struct DocumentIndices {
    pub source: String,
    pub pages: Index,
    pub chunks: Index,
}

/// Embeds units and writes them into fresh collections
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, batch_size: usize) -> Self {
        Indexer {
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Build both indices of a split document; the two are never merged
    pub async fn build_document(&self, source: &str, split: SplitOutput) -> Result<DocumentIndices> {
        let pages = self.build(split.pages, Granularity::Page, source).await?;
        let chunks = self.build(split.chunks, Granularity::Chunk, source).await?;

        Ok(DocumentIndices {
            source: source.to_string(),
            pages,
            chunks,
        })
    }

    /// Build one index from scratch, replacing any previous collection for it
    pub async fn build(
        &self,
        units: Vec<TextUnit>,
        granularity: Granularity,
        source: &str,
    ) -> Result<Index> {
        let collection = collection_name(source, granularity);
        let total = units.len();

        self.write(&collection, units)
            .await
            .map_err(|e| RagError::IndexBuild {
                granularity,
                source: e,
            })?;

        info!("Built {} index {} with {} units", granularity, collection, total);

        Ok(Index {
            granularity,
            collection,
            len: total,
            store: Arc::clone(&self.store),
        })
    }

    async fn write(&self, collection: &str, units: Vec<TextUnit>) -> Result<(), ProviderError> {
        let total = units.len();
        let mut dimension: Option<usize> = None;
        let mut next_id: u64 = 0;

        // Stale points from an earlier build must not survive, even when nothing is written
        self.store.drop_collection(collection).await?;

        for batch in units.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|unit| unit.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(ProviderError::Parse(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            // The collection can only be created once the vector size is known
            let expected = match dimension {
                Some(d) => d,
                None => {
                    let d = embeddings[0].dimension();
                    if d == 0 {
                        return Err(ProviderError::Parse("empty embedding vector".to_string()));
                    }
                    self.store.create_collection(collection, d as u64).await?;
                    dimension = Some(d);
                    d
                }
            };

            if let Some(bad) = embeddings.iter().find(|e| e.dimension() != expected) {
                return Err(ProviderError::Parse(format!(
                    "embedding dimension {} does not match {}",
                    bad.dimension(),
                    expected
                )));
            }

            let points = batch
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(unit, embedding)| {
                    let point = StoredPoint {
                        id: next_id,
                        unit,
                        embedding,
                    };
                    next_id += 1;
                    point
                })
                .collect();

            self.store.insert(collection, points).await?;
            debug!("Indexed {}/{} units into {}", next_id, total, collection);
        }

        Ok(())
    }
}
