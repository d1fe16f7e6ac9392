//! File-backed index catalog.
//!
//! Each `<name>.json` file in the catalog directory is one index: a JSON
//! array of `{id, text, embedding}` passages with precomputed embeddings
//! (same model as `openai.embedding_model`).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use slashgpt_core::error::IndexError;
use slashgpt_core::index::{IndexCatalog, VectorIndex};
use tracing::{debug, warn};

use crate::in_memory::{InMemoryIndex, IndexedPassage};

/// A catalog of in-memory indexes.
#[derive(Default)]
pub struct LocalCatalog {
    indexes: BTreeMap<String, Arc<InMemoryIndex>>,
}

impl LocalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an index under its own name.
    pub fn insert(&mut self, index: InMemoryIndex) {
        self.indexes
            .insert(index.name().to_string(), Arc::new(index));
    }

    /// Load every `*.json` index file in `dir`.
    ///
    /// A missing directory yields an empty catalog; any other read failure
    /// is an error.
    pub fn load_dir(dir: &Path) -> Result<Self, IndexError> {
        let mut catalog = Self::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %dir.display(), "No index directory, catalog is empty");
                return Ok(catalog);
            }
            Err(e) => return Err(IndexError::Storage(format!("{}: {e}", dir.display()))),
        };

        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)
                .map_err(|e| IndexError::Storage(format!("{}: {e}", path.display())))?;
            let passages: Vec<IndexedPassage> = serde_json::from_str(&content)
                .map_err(|e| IndexError::Storage(format!("{}: {e}", path.display())))?;
            debug!(index = %name, passages = passages.len(), "Loaded local index");
            catalog.insert(InMemoryIndex::new(name, passages));
        }

        Ok(catalog)
    }
}

#[async_trait]
impl IndexCatalog for LocalCatalog {
    fn name(&self) -> &str {
        "local"
    }

    async fn list_indexes(&self) -> Result<Vec<String>, IndexError> {
        Ok(self.indexes.keys().cloned().collect())
    }

    async fn open(&self, name: &str) -> Result<Arc<dyn VectorIndex>, IndexError> {
        self.indexes
            .get(name)
            .map(|index| Arc::clone(index) as Arc<dyn VectorIndex>)
            .ok_or_else(|| IndexError::NotFound(name.to_string()))
    }
}
