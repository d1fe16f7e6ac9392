//! In-memory vector index for offline sessions and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slashgpt_core::error::IndexError;
use slashgpt_core::index::{IndexMatch, IndexQuery, VectorIndex};

use crate::vector::rank_passages;

/// A passage with its precomputed embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedPassage {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A vector index held entirely in memory; queries are a brute-force
/// cosine scan.
pub struct InMemoryIndex {
    name: String,
    passages: Vec<IndexedPassage>,
}

impl InMemoryIndex {
    pub fn new(name: impl Into<String>, passages: Vec<IndexedPassage>) -> Self {
        Self {
            name: name.into(),
            passages,
        }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, query: IndexQuery) -> Result<Vec<IndexMatch>, IndexError> {
        if let Some(expected) = self.passages.first().map(|p| p.embedding.len()) {
            if expected != query.vector.len() {
                return Err(IndexError::MalformedResponse(format!(
                    "query has dimension {}, index {} has {}",
                    query.vector.len(),
                    self.name,
                    expected
                )));
            }
        }
        Ok(rank_passages(
            &self.passages,
            &query.vector,
            query.top_k,
            query.include_metadata,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> InMemoryIndex {
        InMemoryIndex::new(
            "olympics",
            vec![
                IndexedPassage {
                    id: "curling".into(),
                    text: "Curling gold went to Sweden.".into(),
                    embedding: vec![1.0, 0.0],
                },
                IndexedPassage {
                    id: "hockey".into(),
                    text: "Hockey gold went to Finland.".into(),
                    embedding: vec![0.0, 1.0],
                },
            ],
        )
    }

    #[tokio::test]
    async fn query_returns_ranked_matches() {
        let matches = index()
            .query(IndexQuery {
                vector: vec![0.9, 0.1],
                top_k: 5,
                include_metadata: true,
            })
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "curling");
        assert_eq!(matches[0].text(), Some("Curling gold went to Sweden."));
    }

    #[tokio::test]
    async fn query_rejects_wrong_dimension() {
        let err = index()
            .query(IndexQuery {
                vector: vec![1.0, 0.0, 0.0],
                top_k: 5,
                include_metadata: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn empty_index_returns_no_matches() {
        let empty = InMemoryIndex::new("empty", vec![]);
        assert!(empty.is_empty());
        let matches = empty
            .query(IndexQuery {
                vector: vec![1.0],
                top_k: 5,
                include_metadata: true,
            })
            .await
            .unwrap();
        assert!(matches.is_empty());
    }
}
