use crate::chunking::{Granularity, TextUnit};
use crate::config::{request_timeout, var};
use crate::embeddings::Embedding;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use log::{debug, info};
use qdrant_client::qdrant::{
    with_payload_selector, CreateCollectionBuilder, Distance, PointStruct, ScoredPoint,
    SearchPoints, UpsertPointsBuilder, Value, VectorParams, WithPayloadSelector,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::time::Duration;

/// A unit and its vector, ready to be written
#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub id: u64,
    pub unit: TextUnit,
    pub embedding: Embedding,
}

/// A unit returned by a similarity search
#[derive(Debug, Clone)]
pub struct ScoredUnit {
    pub unit: TextUnit,
    pub score: f32,
}

/// Storage of embedded units, one collection per index
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Fail if the store cannot be reached
    async fn ping(&self) -> Result<(), ProviderError>;

    /// Drop the collection if present
    async fn drop_collection(&self, collection: &str) -> Result<(), ProviderError>;

    /// Create an empty collection for vectors of the given size
    async fn create_collection(&self, collection: &str, dimension: u64)
        -> Result<(), ProviderError>;

    async fn insert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<(), ProviderError>;

    /// Nearest units first
    async fn search(
        &self,
        collection: &str,
        query: &Embedding,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredUnit>, ProviderError>;
}

/// Configuration for Qdrant
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl QdrantConfig {
    pub fn from_vars<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(QdrantConfig {
            url: var(lookup, "QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".to_string()),
            api_key: var(lookup, "QDRANT_API_KEY"),
            timeout: request_timeout(lookup)?,
        })
    }
}

/// Client for interacting with Qdrant
pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    /// Create a new Qdrant client
    pub fn new(config: QdrantConfig) -> Result<Self, ProviderError> {
        let config_builder = Qdrant::from_url(&config.url).timeout(config.timeout);
        let config_builder = if let Some(api_key) = config.api_key {
            config_builder.api_key(api_key)
        } else {
            config_builder
        };

        let client = config_builder.build()?;

        Ok(QdrantStore { client })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ping(&self) -> Result<(), ProviderError> {
        let reply = self.client.health_check().await?;
        debug!("Qdrant {} is reachable", reply.version);
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), ProviderError> {
        if self.client.collection_exists(collection).await? {
            info!("Dropping existing collection {}", collection);
            self.client.delete_collection(collection.to_string()).await?;
        }
        Ok(())
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimension: u64,
    ) -> Result<(), ProviderError> {
        let create_collection = CreateCollectionBuilder::new(collection.to_string())
            .vectors_config(VectorParams {
                size: dimension,
                distance: Distance::Cosine.into(),
                ..Default::default()
            });

        self.client.create_collection(create_collection).await?;

        Ok(())
    }

    async fn insert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<(), ProviderError> {
        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|point| PointStruct::new(point.id, point.embedding.values, payload(&point.unit)))
            .collect();

        let upsert_request = UpsertPointsBuilder::new(collection.to_string(), points)
            .wait(true)
            .build();

        self.client.upsert_points(upsert_request).await?;

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &Embedding,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredUnit>, ProviderError> {
        let search_request = SearchPoints {
            collection_name: collection.to_string(),
            vector: query.values.clone(),
            limit,
            score_threshold: min_score,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(with_payload_selector::SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let search_response = self.client.search_points(search_request).await?;

        scored_units(collection, search_response.result)
    }
}

/// Every hit must carry a citable payload
fn scored_units(
    collection: &str,
    points: Vec<ScoredPoint>,
) -> Result<Vec<ScoredUnit>, ProviderError> {
    points
        .into_iter()
        .map(|scored_point| {
            let unit = unit_from_payload(&scored_point.payload).ok_or_else(|| {
                ProviderError::Parse(format!(
                    "point in {} has no readable payload",
                    collection
                ))
            })?;
            Ok(ScoredUnit {
                unit,
                score: scored_point.score,
            })
        })
        .collect()
}

fn payload(unit: &TextUnit) -> HashMap<String, Value> {
    let mut payload = HashMap::new();
    payload.insert("text".to_string(), Value::from(unit.content.clone()));
    payload.insert("source".to_string(), Value::from(unit.source.clone()));
    payload.insert("page_number".to_string(), Value::from(unit.page_number as i64));
    payload.insert(
        "granularity".to_string(),
        Value::from(unit.granularity.as_str().to_string()),
    );
    payload
}

fn unit_from_payload(payload: &HashMap<String, Value>) -> Option<TextUnit> {
    let content = payload.get("text")?.as_str()?.to_string();
    let source = payload.get("source")?.as_str()?.to_string();
    let page_number = payload.get("page_number")?.as_integer()?;
    let granularity = match payload.get("granularity")?.as_str()?.as_str() {
        "page" => Granularity::Page,
        "chunk" => Granularity::Chunk,
        _ => return None,
    };

    Some(TextUnit {
        content,
        source,
        page_number: u32::try_from(page_number).ok()?,
        granularity,
    })
}

/// Generate a collection name from a source identifier and granularity
pub fn collection_name(source: &str, granularity: Granularity) -> String {
    // Replace non-alphanumeric characters with underscores and convert to lowercase
    let name = source
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_lowercase();

    format!("rag_{}_{}", name, granularity)
}
