//! Vector index traits over similarity-search backends.
//!
//! A catalog lists the indexes a deployment knows about and opens them by
//! name; an opened index answers nearest-neighbour queries with ranked
//! matches whose metadata carries the source passage text.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// A nearest-neighbour query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexQuery {
    /// The query embedding
    pub vector: Vec<f32>,

    /// Maximum number of matches
    pub top_k: usize,

    /// Whether the backend should return match metadata
    #[serde(default = "default_true")]
    pub include_metadata: bool,
}

fn default_true() -> bool {
    true
}

/// A single ranked match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,

    /// Similarity score (higher is closer)
    pub score: f32,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl IndexMatch {
    /// The passage text stored under the `text` metadata key.
    pub fn text(&self) -> Option<&str> {
        self.metadata.get("text").and_then(|v| v.as_str())
    }
}

/// An opened vector index.
///
/// Implementations: Pinecone, in-memory (local files and tests).
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The index name.
    fn name(&self) -> &str;

    /// Return up to `top_k` matches, best first.
    async fn query(&self, query: IndexQuery) -> std::result::Result<Vec<IndexMatch>, IndexError>;
}

/// The set of indexes a backend exposes.
#[async_trait]
pub trait IndexCatalog: Send + Sync {
    /// The backend name (e.g., "pinecone", "local").
    fn name(&self) -> &str;

    /// Names of every index in the catalog.
    async fn list_indexes(&self) -> std::result::Result<Vec<String>, IndexError>;

    /// Open an index by name.
    async fn open(&self, name: &str) -> std::result::Result<Arc<dyn VectorIndex>, IndexError>;
}
