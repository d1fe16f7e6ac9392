//! Local vector index implementations for SlashGPT.
//!
//! Used when `index.backend = "local"` and by tests that need a
//! deterministic index without network access.

pub mod catalog;
pub mod in_memory;
pub mod vector;

pub use catalog::LocalCatalog;
pub use in_memory::{InMemoryIndex, IndexedPassage};
pub use vector::{cosine_similarity, rank_passages};
