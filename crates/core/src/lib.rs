//! # SlashGPT Core
//!
//! Domain types, traits, and error definitions for the SlashGPT chat client.
//! This crate has **no transport dependencies**: it defines the domain model
//! that the provider, index, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion API, embedding API, vector index)
//! is defined as a trait here. Implementations live in their respective
//! crates, so the prompt builder and chat session can be tested against
//! scripted mocks.

pub mod error;
pub mod index;
pub mod manifest;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use index::{IndexCatalog, IndexMatch, IndexQuery, VectorIndex};
pub use manifest::{Manifest, ManifestStore};
pub use message::{Conversation, Message, Role};
pub use provider::{EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse};
