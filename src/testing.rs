//! In-process stand-ins for the external services, used by unit tests.

use crate::chunking::{Granularity, TextUnit};
use crate::database::{ScoredUnit, StoredPoint, VectorStore};
use crate::embeddings::{Embedder, Embedding};
use crate::error::ProviderError;
use crate::llm::{ChatMessage, ChatModel};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub fn unit(content: &str, page_number: u32, granularity: Granularity) -> TextUnit {
    TextUnit {
        content: content.to_string(),
        source: "anayasa.pdf".to_string(),
        page_number,
        granularity,
    }
}

/// Bag-of-words vectors: texts sharing words end up close together
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        HashEmbedder { dimension: 256 }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        let mut values = vec![0.0; self.dimension];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            values[(hasher.finish() % self.dimension as u64) as usize] += 1.0;
        }
        // Keep every vector non-zero so cosine similarity is always defined
        values[0] += 0.01;
        Ok(Embedding::new(values).normalized())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding, ProviderError> {
        Err(ProviderError::Api {
            status: 503,
            body: "model is loading".to_string(),
        })
    }
}

/// Brute-force cosine search over points kept in memory
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<StoredPoint>>>,
    unreachable: AtomicBool,
}

impl MemoryStore {
    pub fn unreachable() -> Self {
        MemoryStore {
            collections: Mutex::default(),
            unreachable: AtomicBool::new(true),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map_or(0, Vec::len)
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ProviderError::Api {
                status: 503,
                body: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ping(&self) -> Result<(), ProviderError> {
        self.check()
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), ProviderError> {
        self.check()?;
        self.collections.lock().unwrap().remove(collection);
        Ok(())
    }

    async fn create_collection(
        &self,
        collection: &str,
        _dimension: u64,
    ) -> Result<(), ProviderError> {
        self.check()?;
        self.collections
            .lock()
            .unwrap()
            .insert(collection.to_string(), Vec::new());
        Ok(())
    }

    async fn insert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<(), ProviderError> {
        self.check()?;
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .extend(points);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &Embedding,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredUnit>, ProviderError> {
        self.check()?;
        let collections = self.collections.lock().unwrap();
        let points = collections
            .get(collection)
            .ok_or_else(|| ProviderError::Api {
                status: 404,
                body: format!("collection {} not found", collection),
            })?;

        let mut scored: Vec<ScoredUnit> = points
            .iter()
            .map(|point| ScoredUnit {
                unit: point.unit.clone(),
                score: dot(&point.embedding.values, &query.values),
            })
            .filter(|scored| min_score.map_or(true, |min| scored.score >= min))
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit as usize);
        Ok(scored)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Language model that answers from a script and remembers what it was asked
pub struct ScriptedChat {
    reply: Result<String, u16>,
    calls: Mutex<Vec<(Vec<ChatMessage>, String, f32)>>,
}

impl ScriptedChat {
    pub fn replying(reply: &str) -> Self {
        ScriptedChat {
            reply: Ok(reply.to_string()),
            calls: Mutex::default(),
        }
    }

    pub fn failing(status: u16) -> Self {
        ScriptedChat {
            reply: Err(status),
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<(Vec<ChatMessage>, String, f32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), model.to_string(), temperature));

        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(ProviderError::Api {
                status: *status,
                body: "scripted failure".to_string(),
            }),
        }
    }
}
