//! Error types for the SlashGPT domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all SlashGPT operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion / embedding provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Vector index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Token counting ---
    #[error("Tokenizer unavailable for model '{model}': {reason}")]
    Tokenizer { model: String, reason: String },

    // --- Filesystem ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("No index named {0}")]
    NotFound(String),

    #[error("Index request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed index response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Index storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse manifest {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid temperature '{0}' in manifest")]
    InvalidTemperature(String),
}
