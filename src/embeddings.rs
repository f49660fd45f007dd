use crate::config::{parsed, request_timeout, var};
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Scale to unit length; zero vectors are left untouched
    pub fn normalized(mut self) -> Self {
        let norm = self.values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut self.values {
                *value /= norm;
            }
        }
        self
    }
}

/// Anything that turns text into comparable vectors
///
/// The same embedder must be used for indexing and querying.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError>;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Configuration for the embedding service
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible embeddings API (e.g. a text-embeddings-inference server)
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Scale every vector to unit length
    pub normalize: bool,
    /// Texts sent per request during indexing
    pub batch_size: usize,
    pub timeout: Duration,
}

impl EmbeddingConfig {
    pub fn from_vars<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let batch_size: usize = parsed(lookup, "EMBEDDING_BATCH_SIZE", 32)?;

        Ok(EmbeddingConfig {
            url: var(lookup, "EMBEDDING_URL")
                .unwrap_or_else(|| "http://localhost:8080/v1".to_string()),
            model: var(lookup, "EMBEDDING_MODEL").unwrap_or_else(|| "BAAI/bge-m3".to_string()),
            api_key: var(lookup, "EMBEDDING_API_KEY"),
            normalize: parsed(lookup, "EMBEDDING_NORMALIZE", true)?,
            batch_size: batch_size.max(1),
            timeout: request_timeout(lookup)?,
        })
    }
}

/// Client for an OpenAI-compatible `/embeddings` endpoint
#[derive(Clone)]
pub struct HttpEmbedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

impl HttpEmbedder {
    /// Create a new embedding client
    pub fn new(config: EmbeddingConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(HttpEmbedder { config, client })
    }

    /// Get the client configuration
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input,
        };

        let url = format!("{}/embeddings", self.config.url.trim_end_matches('/'));
        debug!("Embedding {} texts via {}", input.len(), url);

        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api { status, body });
        }

        let mut response_data: EmbeddingResponse = response.json().await?;

        if response_data.data.len() != input.len() {
            return Err(ProviderError::Parse(format!(
                "expected {} embeddings, got {}",
                input.len(),
                response_data.data.len()
            )));
        }

        response_data.data.sort_by_key(|d| d.index);

        Ok(response_data
            .data
            .into_iter()
            .map(|d| {
                let embedding = Embedding::new(d.embedding);
                if self.config.normalize {
                    embedding.normalized()
                } else {
                    embedding
                }
            })
            .collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.request(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
