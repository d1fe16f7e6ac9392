//! Token counting.
//!
//! [`TiktokenCounter`] measures text with the BPE encoding of a specific
//! model. [`HeuristicCounter`] uses ~4 characters per token, which is within
//! ~10% for BPE tokenizers on English text and needs no model lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use slashgpt_config::TokenizerKind;
use slashgpt_core::error::{Error, Result};
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Measures text size in model-token units.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Character-based counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Exact counter using the model's BPE encoding.
pub struct TiktokenCounter {
    model: String,
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Look up the encoding for `model`.
    ///
    /// Fails for models tiktoken does not know.
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|e| Error::Tokenizer {
            model: model.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            model: model.to_string(),
            bpe,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Hands out the counter for a model, building BPE counters on first use.
pub struct TokenCounters {
    kind: TokenizerKind,
    cache: Mutex<HashMap<String, Arc<dyn TokenCounter>>>,
}

impl TokenCounters {
    pub fn new(kind: TokenizerKind) -> Self {
        Self {
            kind,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> TokenizerKind {
        self.kind
    }

    /// The counter to use for text sent to `model`.
    pub fn counter_for(&self, model: &str) -> Result<Arc<dyn TokenCounter>> {
        if self.kind == TokenizerKind::Heuristic {
            return Ok(Arc::new(HeuristicCounter));
        }

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(counter) = cache.get(model) {
            return Ok(Arc::clone(counter));
        }

        let counter: Arc<dyn TokenCounter> = Arc::new(TiktokenCounter::for_model(model)?);
        debug!(model, "Loaded BPE encoding");
        cache.insert(model.to_string(), Arc::clone(&counter));
        Ok(counter)
    }
}
