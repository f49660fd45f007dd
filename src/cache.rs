use crate::error::Result;
use crate::index::DocumentIndices;
use log::info;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Built indices per source document, kept for the life of the process
///
/// Each document is built at most once, even when several callers ask for it at the
/// same time. Entries are never invalidated. A failed build leaves the slot empty.
#[derive(Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<DocumentIndices>>>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        SessionCache::default()
    }

    /// Return the cached indices for `source`, running `build` if there are none yet
    pub async fn get_or_build<F, Fut>(&self, source: &str, build: F) -> Result<Arc<DocumentIndices>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DocumentIndices>>,
    {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(source.to_string()).or_default())
        };

        if let Some(indices) = cell.get() {
            info!("Using cached indices for {}", source);
            return Ok(Arc::clone(indices));
        }

        let indices = cell
            .get_or_try_init(|| async move { build().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(indices))
    }

    /// Cached indices for `source`, if they were built
    pub fn get(&self, source: &str) -> Option<Arc<DocumentIndices>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(source)?.get().cloned()
    }
}
