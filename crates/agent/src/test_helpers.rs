//! Shared test helpers for session and shell tests.

use std::sync::{Arc, Mutex};

use slashgpt_core::error::ProviderError;
use slashgpt_core::message::Message;
use slashgpt_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use slashgpt_index::{InMemoryIndex, IndexedPassage, LocalCatalog};

/// A mock provider that returns a sequence of scripted replies.
///
/// Each call to `complete` returns the next reply in the queue and records
/// the request. Panics if more calls are made than replies provided.
/// Every embedding is the same fixed vector.
pub struct SequentialMockProvider {
    replies: Vec<String>,
    requests: Mutex<Vec<ProviderRequest>>,
    embeddings: Mutex<Vec<String>>,
    vector: Vec<f32>,
}

impl SequentialMockProvider {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| r.to_string()).collect(),
            requests: Mutex::new(Vec::new()),
            embeddings: Mutex::new(Vec::new()),
            vector: vec![1.0, 0.0],
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Texts sent to `embed`, in call order.
    pub fn embedded(&self) -> Vec<String> {
        self.embeddings.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let count = requests.len();
        if count >= self.replies.len() {
            panic!(
                "SequentialMockProvider: no more replies (call #{}, have {})",
                count,
                self.replies.len()
            );
        }
        requests.push(request.clone());
        Ok(make_text_response(&self.replies[count], &request.model))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.embeddings
            .lock()
            .unwrap()
            .extend(request.inputs.iter().cloned());
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|_| self.vector.clone()).collect(),
            model: request.model,
            usage: None,
        })
    }
}

/// Create a plain assistant reply.
pub fn make_text_response(text: &str, model: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: model.into(),
    }
}

/// A catalog holding one two-passage index named `olympics`.
pub fn olympics_catalog() -> Arc<LocalCatalog> {
    let mut catalog = LocalCatalog::new();
    catalog.insert(InMemoryIndex::new(
        "olympics",
        vec![
            IndexedPassage {
                id: "curling".into(),
                text: "Sweden won curling gold.".into(),
                embedding: vec![1.0, 0.0],
            },
            IndexedPassage {
                id: "hockey".into(),
                text: "Finland won ice hockey gold.".into(),
                embedding: vec![0.6, 0.8],
            },
        ],
    ));
    Arc::new(catalog)
}
