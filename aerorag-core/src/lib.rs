//! aerorag-core - Retrieval core
//!
//! Provides the components for matching a requested configuration against a
//! reference knowledge base:
//! - Embedding provider abstraction (OpenAI, deterministic offline)
//! - Persistent vector collections (LanceDB) with an in-memory fallback
//! - The retrieval engine with threshold-filtered, ranked similarity search
//! - Configuration management
//!
//! ## Primary API
//!
//! Build a [`RagEngine`] once from a [`Config`] at startup and pass it by
//! reference to whatever serves requests. Nothing in this crate is a global.

// Public modules
pub mod config;
pub mod provider;
pub mod rag;

// Public exports
pub use config::{Config, ConfigError, EmbeddingProviderKind, Environment, StorageMode};
pub use rag::{
    DistanceMetric, Document, DocumentRef, Metadata, MetadataValue, RagEngine, RagError,
    SimilarityResult,
};

// Provider exports
pub use provider::{EmbeddingProvider, HashedEmbedder, OpenAiProvider, ProviderError};
