//! Retrieval context for the system prompt.
//!
//! - [`token`]: measuring text in model tokens
//! - [`articles`]: fetching passages and packing them under a token budget

pub mod articles;
pub mod token;

pub use articles::{
    EmbeddingRetriever, Passage, ReferenceBlock, Retriever, build_augmented_prompt,
    format_section, pack_passages, retrieval_query,
};
pub use token::{HeuristicCounter, TiktokenCounter, TokenCounter, TokenCounters, estimate_tokens};
