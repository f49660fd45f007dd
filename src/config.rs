use crate::chunking::SplitterConfig;
use crate::database::QdrantConfig;
use crate::embeddings::EmbeddingConfig;
use crate::error::{RagError, Result};
use crate::llm::ChatConfig;
use crate::retrieval::RetrievalConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Every setting the application needs, read once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub splitter: SplitterConfig,
    pub embedding: EmbeddingConfig,
    pub qdrant: QdrantConfig,
    pub retrieval: RetrievalConfig,
    pub chat: ChatConfig,
}

impl Settings {
    /// Create the configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Create the configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Credentials first so a missing key fails before anything else is parsed
        let chat = ChatConfig::from_vars(&lookup)?;

        Ok(Settings {
            splitter: SplitterConfig::from_vars(&lookup)?,
            embedding: EmbeddingConfig::from_vars(&lookup)?,
            qdrant: QdrantConfig::from_vars(&lookup)?,
            retrieval: RetrievalConfig::from_vars(&lookup)?,
            chat,
        })
    }
}

/// Read a variable, treating blank values as unset
pub(crate) fn var<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read a variable that must be present
pub(crate) fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(lookup, key).ok_or_else(|| RagError::Configuration(format!("{} is not set", key)))
}

/// Read and parse a variable, falling back to `default` when unset
pub(crate) fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| RagError::Configuration(format!("invalid value for {}: {} ({})", key, raw, e))),
        None => Ok(default),
    }
}

/// Timeout applied to every outbound call
pub(crate) fn request_timeout<F>(lookup: &F) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parsed(lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
    if secs == 0 {
        return Err(RagError::Configuration(
            "REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
