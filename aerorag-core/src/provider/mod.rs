//! Embedding provider abstraction layer.
//!
//! This module defines a common interface for turning text into vectors,
//! with a remote OpenAI-backed implementation and a deterministic offline one.

mod types;
pub mod hashed;
pub mod openai;

// Re-export common types
pub use types::{
    EmbedRequest,
    EmbedResponse,
    EmbeddingData,
    EmbeddingProvider,
    ProviderError,
    Result,
};

// Re-export provider implementations
pub use hashed::HashedEmbedder;
pub use openai::OpenAiProvider;

use crate::config::{EmbeddingConfig, EmbeddingProviderKind};
use std::sync::Arc;

/// Builds the provider selected by `embedding.provider`.
pub fn create_provider(config: &EmbeddingConfig) -> Arc<dyn EmbeddingProvider> {
    match config.provider {
        EmbeddingProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)),
        EmbeddingProviderKind::Local => Arc::new(HashedEmbedder::new(config.dimension)),
    }
}
