pub mod cache;
pub mod chunking;
pub mod config;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod export;
pub mod index;
pub mod llm;
pub mod prompt;
pub mod rag;
pub mod retrieval;

#[cfg(test)]
mod testing;
