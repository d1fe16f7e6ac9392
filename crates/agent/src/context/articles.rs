//! Retrieval-augmented system prompts.
//!
//! Before each model call on a persona with an index, the user's turns are
//! turned into a retrieval query, related passages are fetched, and as many
//! as fit under the token budget are packed into the `{articles}` slot of
//! the persona's prompt.
//!
//! # Packing policy
//!
//! Passages are taken greedily in the rank order the index returned. Before
//! each append the whole candidate (`block + passage + query`) is measured;
//! the first passage that would push it over the budget stops packing. No
//! partial passages, no skipping ahead to smaller ones.

use std::sync::Arc;

use async_trait::async_trait;
use slashgpt_core::error::{IndexError, ProviderError, Result};
use slashgpt_core::index::{IndexQuery, VectorIndex};
use slashgpt_core::provider::{EmbeddingRequest, Provider};
use tracing::{debug, info};

use crate::context::token::TokenCounter;
use crate::template::{ARTICLES, Bindings, PromptTemplate};

/// A retrieved passage.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    /// Similarity score reported by the index
    pub score: f32,
    pub text: String,
}

/// Fetches passages related to a query, best first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Passage>>;
}

/// The packed reference block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceBlock {
    pub text: String,
    /// Passages included
    pub included: usize,
    /// Passages offered
    pub total: usize,
}

/// Wrap one passage in the section delimiter.
pub fn format_section(text: &str) -> String {
    format!("\n\nWikipedia article section:\n\"\"\"\n{text}\n\"\"\"")
}

/// Build the retrieval query from user turns given oldest first.
///
/// Each turn is followed by a newline; the most recent turn comes first.
pub fn retrieval_query<'a>(user_turns: impl IntoIterator<Item = &'a str>) -> String {
    user_turns
        .into_iter()
        .fold(String::new(), |query, turn| format!("{turn}\n{query}"))
}

/// Greedily pack passages under `budget` tokens (block plus query).
pub fn pack_passages(
    passages: &[Passage],
    query: &str,
    counter: &dyn TokenCounter,
    budget: usize,
) -> ReferenceBlock {
    let mut block = ReferenceBlock {
        total: passages.len(),
        ..ReferenceBlock::default()
    };

    for passage in passages {
        let section = format_section(&passage.text);
        let candidate = format!("{}{}{}", block.text, section, query);
        if counter.count(&candidate) > budget {
            break;
        }
        block.text.push_str(&section);
        block.included += 1;
    }

    block
}

/// Produce the system prompt for the next model call.
///
/// Fails if retrieval fails; an empty or over-budget result is not an error
/// and leaves the `{articles}` slot empty.
pub async fn build_augmented_prompt<'a>(
    template: &PromptTemplate,
    user_turns: impl IntoIterator<Item = &'a str>,
    retriever: &dyn Retriever,
    counter: &dyn TokenCounter,
    budget: usize,
) -> Result<String> {
    let query = retrieval_query(user_turns);
    let passages = retriever.retrieve(&query).await?;
    let block = pack_passages(&passages, &query, counter, budget);

    info!(
        included = block.included,
        retrieved = block.total,
        budget,
        "Packed reference articles"
    );

    Ok(template.render(&Bindings::new().once(ARTICLES, block.text)))
}

/// Retriever that embeds the query and searches a vector index.
pub struct EmbeddingRetriever {
    provider: Arc<dyn Provider>,
    embedding_model: String,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl EmbeddingRetriever {
    pub fn new(
        provider: Arc<dyn Provider>,
        embedding_model: impl Into<String>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
    ) -> Self {
        Self {
            provider,
            embedding_model: embedding_model.into(),
            index,
            top_k,
        }
    }

    pub fn index_name(&self) -> &str {
        self.index.name()
    }
}

#[async_trait]
impl Retriever for EmbeddingRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Passage>> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![query.to_string()],
            })
            .await?;

        let vector = response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("no embedding in response".into()))?;

        let matches = self
            .index
            .query(IndexQuery {
                vector,
                top_k: self.top_k,
                include_metadata: true,
            })
            .await?;

        debug!(index = %self.index.name(), matches = matches.len(), "Index query returned");

        matches
            .into_iter()
            .map(|m| -> Result<Passage> {
                let text = m.text().ok_or_else(|| {
                    IndexError::MalformedResponse(format!("match {} has no text metadata", m.id))
                })?;
                Ok(Passage {
                    score: m.score,
                    text: text.to_string(),
                })
            })
            .collect()
    }
}
