//! Similarity retrieval over the reference collection.
//!
//! # Architecture
//!
//! - [`provider`](crate::provider): converts text to vectors
//! - [`store`]: the persistent vector collection (LanceDB or in-memory)
//! - [`RagEngine`]: embeds a query, asks the collection for neighbours,
//!   converts distance to similarity, filters by threshold and ranks
//!
//! # How It Works
//!
//! 1. **Ingestion**: each reference record is embedded and added under a
//!    content-derived id, so re-ingesting the same record is rejected as a
//!    duplicate instead of being stored twice.
//! 2. **Retrieval**:
//!    - the query text is embedded with the same provider
//!    - the collection returns up to `limit` nearest neighbours, closest first
//!    - each distance becomes a similarity score (`1 - d` for cosine)
//!    - scores below the threshold are dropped and survivors ranked from 1

mod lancedb_store;
mod memory_store;
mod store;
mod types;

pub use lancedb_store::LanceDbCollection;
pub use memory_store::MemoryCollection;
pub use store::{open_collection, CollectionError, VectorCollection};
pub use types::{
    DistanceMetric, Document, DocumentRef, Metadata, MetadataValue, QueryHit, SimilarityResult,
};

use crate::config::{Config, ConfigError};
use crate::provider::{create_provider, EmbeddingProvider, ProviderError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Embedding provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Vector collection error: {0}")]
    Collection(#[from] CollectionError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RagError {
    /// True when an add was rejected because the id already exists.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Collection(CollectionError::DuplicateId(_)))
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

/// Retrieval engine tying an embedding provider to a vector collection.
///
/// Built once at startup and shared by reference (or clone; clones share the
/// same provider and collection). Each call is independent: no state is
/// carried between searches and no lock is held across steps.
///
/// # Configuration
///
/// - `rag.similarity_threshold`: minimum score a match needs
/// - `rag.top_k`: limit used when the caller passes `None`
/// - `rag.metric`: distance metric for queries and score conversion
#[derive(Clone)]
pub struct RagEngine {
    provider: Arc<dyn EmbeddingProvider>,
    collection: Arc<dyn VectorCollection>,
    similarity_threshold: f32,
    default_limit: usize,
}

impl RagEngine {
    /// Validates the config, builds the provider and opens the collection.
    ///
    /// Fails before touching storage if a remote provider has no credential.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use aerorag_core::{Config, RagEngine};
    /// # async fn example() {
    /// let config = Config::load_or_default();
    /// let engine = RagEngine::new(&config).await.unwrap();
    /// let matches = engine.search_similar("thin low-drag airfoil", None).await.unwrap();
    /// # }
    /// ```
    pub async fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let provider = create_provider(&config.embedding);
        let collection = open_collection(
            &config.storage,
            config.embedding.dimension,
            config.rag.metric,
        )
        .await?;

        info!(
            collection = %collection.name(),
            model = %provider.model(),
            dimension = provider.dimension(),
            "Retrieval engine initialized"
        );

        Self::with_components(
            provider,
            collection,
            config.rag.similarity_threshold,
            config.rag.top_k,
        )
    }

    /// Assembles an engine from already-built parts.
    pub fn with_components(
        provider: Arc<dyn EmbeddingProvider>,
        collection: Arc<dyn VectorCollection>,
        similarity_threshold: f32,
        default_limit: usize,
    ) -> Result<Self> {
        if provider.dimension() == 0 {
            return Err(RagError::Validation("embedding dimension must be positive".to_string()));
        }
        if provider.dimension() != collection.dimension() {
            return Err(RagError::Validation(format!(
                "provider dimension {} does not match collection dimension {}",
                provider.dimension(),
                collection.dimension()
            )));
        }
        if default_limit == 0 {
            return Err(RagError::Validation("default limit must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(RagError::Validation(format!(
                "similarity threshold must be within [0, 1], got {}",
                similarity_threshold
            )));
        }

        Ok(Self {
            provider,
            collection,
            similarity_threshold,
            default_limit,
        })
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn collection(&self) -> &Arc<dyn VectorCollection> {
        &self.collection
    }

    /// Embeds `text` and stores it under `id`.
    ///
    /// This is the entry point for bulk ingestion. Callers should pass a
    /// content-derived id (see [`Document::slug_id`] and
    /// [`Document::content_id`]) so a repeated load surfaces as
    /// [`CollectionError::DuplicateId`] rather than a second copy.
    pub async fn add_reference(&self, id: &str, text: &str, metadata: Metadata) -> Result<()> {
        let vector = self.provider.embed(text).await?;
        let document = Document::new(id, text, vector).with_metadata_map(metadata);
        self.collection.add(document).await?;
        debug!(id = %id, "Added reference document");
        Ok(())
    }

    /// Finds the stored documents most similar to `query_text`.
    ///
    /// At most `limit` neighbours are fetched (the configured top-k when
    /// `None`), then anything scoring below the threshold is dropped. The
    /// survivors keep the index's order and are ranked from 1.
    ///
    /// An empty result is a normal outcome, including on an empty collection.
    ///
    /// # Errors
    ///
    /// - [`RagError::Validation`] if `limit` is `Some(0)`
    /// - [`RagError::Provider`] if embedding the query fails
    /// - [`RagError::Collection`] if the index query fails
    pub async fn search_similar(
        &self,
        query_text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SimilarityResult>> {
        let limit = limit.unwrap_or(self.default_limit);
        if limit == 0 {
            return Err(RagError::Validation("limit must be positive".to_string()));
        }

        debug!(limit, "Generating query embedding");
        let query_vector = self.provider.embed(query_text).await?;

        let hits = self.collection.query(&query_vector, limit).await?;
        let candidates = hits.len();

        let metric = self.collection.metric();
        let results: Vec<SimilarityResult> = hits
            .into_iter()
            .filter_map(|hit| {
                let score = metric.to_similarity(hit.distance);
                (score >= self.similarity_threshold).then_some((hit, score))
            })
            .enumerate()
            .map(|(i, (hit, score))| SimilarityResult {
                document: hit.document,
                score,
                distance: hit.distance,
                rank: i + 1,
            })
            .collect();

        info!(
            candidates,
            returned = results.len(),
            threshold = self.similarity_threshold,
            "Similarity search complete"
        );
        Ok(results)
    }

    /// Looks up a stored document by id.
    pub async fn get(&self, id: &str) -> Result<Option<DocumentRef>> {
        Ok(self.collection.get(id).await?)
    }

    /// Removes documents by id, returning how many were removed.
    pub async fn remove(&self, ids: &[String]) -> Result<usize> {
        Ok(self.collection.delete(ids).await?)
    }

    /// Removes every document from the collection.
    ///
    /// Destructive and unguarded: callers decide whether the current
    /// environment allows it.
    pub async fn clear_collection(&self) -> Result<()> {
        self.collection.clear().await?;
        warn!(collection = %self.collection.name(), "Reference collection cleared");
        Ok(())
    }

    /// Returns the total number of documents in the collection.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.collection.count().await?)
    }
}
