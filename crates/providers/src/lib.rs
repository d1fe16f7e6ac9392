//! Remote service clients for SlashGPT.
//!
//! The completion/embedding provider implements `slashgpt_core::Provider`;
//! the Pinecone catalog implements `slashgpt_core::IndexCatalog`.

pub mod openai_compat;
pub mod pinecone;

pub use openai_compat::OpenAiCompatProvider;
pub use pinecone::{PineconeCatalog, PineconeIndex};

use slashgpt_config::AppConfig;
use slashgpt_core::error::{IndexError, ProviderError};

/// Build the completion/embedding provider from configuration.
pub fn provider_from_config(config: &AppConfig) -> Result<OpenAiCompatProvider, ProviderError> {
    let api_key = config
        .openai
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("OPENAI_API_KEY is not set".into()))?;
    OpenAiCompatProvider::new("openai", &config.openai.api_url, api_key)
}

/// Build the Pinecone catalog from configuration.
pub fn pinecone_from_config(config: &AppConfig) -> Result<PineconeCatalog, IndexError> {
    let pinecone = &config.pinecone;
    let api_key = pinecone
        .api_key
        .clone()
        .ok_or_else(|| IndexError::AuthenticationFailed("PINECONE_API_KEY is not set".into()))?;

    match (&pinecone.controller_url, &pinecone.environment) {
        (Some(url), _) => PineconeCatalog::with_controller(api_key, url.as_str()),
        (None, Some(environment)) => PineconeCatalog::new(api_key, environment),
        (None, None) => Err(IndexError::AuthenticationFailed(
            "PINECONE_ENVIRONMENT is not set".into(),
        )),
    }
}
