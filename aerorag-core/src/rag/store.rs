//! Vector collection abstraction and factory.
//!
//! This module provides a unified interface over the index backends that hold
//! a named collection of documents.

use super::lancedb_store::LanceDbCollection;
use super::memory_store::MemoryCollection;
use super::types::{DistanceMetric, Document, DocumentRef, Metadata, MetadataValue, QueryHit};
use crate::config::{StorageConfig, StorageMode};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a vector collection.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Document '{0}' already exists in the collection")]
    DuplicateId(String),

    #[error("Vector dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid metadata '{key}': {reason}")]
    InvalidMetadata { key: String, reason: String },

    #[error("Vector index error: {0:#}")]
    Index(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CollectionError>;

/// A named set of (id, vector, text, metadata) records.
///
/// Each call is atomic at whatever granularity the backend provides; the
/// trait adds no locking across calls.
#[async_trait]
pub trait VectorCollection: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// Length every stored vector has.
    fn dimension(&self) -> usize;

    /// Metric the index ranks neighbours by.
    fn metric(&self) -> DistanceMetric;

    /// Stores a document.
    ///
    /// Fails with [`CollectionError::DuplicateId`] if the id is already present
    /// and with [`CollectionError::InvalidMetadata`] on a non-finite float.
    async fn add(&self, document: Document) -> Result<()>;

    /// Looks up a single document by id.
    async fn get(&self, id: &str) -> Result<Option<DocumentRef>>;

    /// Up to `k` nearest neighbours of `vector`, closest first.
    ///
    /// Returns fewer than `k` hits when the collection holds fewer documents
    /// and an empty vector when it holds none.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>>;

    /// Removes the given ids. Unknown ids are ignored.
    ///
    /// # Returns
    ///
    /// The number of documents removed.
    async fn delete(&self, ids: &[String]) -> Result<usize>;

    /// Removes every document. Clearing an empty collection is a no-op.
    async fn clear(&self) -> Result<()>;

    /// Returns the total number of documents in the collection.
    async fn count(&self) -> Result<usize>;
}

pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(CollectionError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Rejects NaN and infinite floats, which JSON cannot round-trip.
pub(crate) fn check_metadata(metadata: &Metadata) -> Result<()> {
    for (key, value) in metadata {
        if let MetadataValue::Float(f) = value {
            if !f.is_finite() {
                return Err(CollectionError::InvalidMetadata {
                    key: key.clone(),
                    reason: format!("float must be finite, got {}", f),
                });
            }
        }
    }
    Ok(())
}

/// Opens the configured collection, creating it on first access.
///
/// - `Embedded` mode uses LanceDB persisted under the configured path
/// - `Memory` mode keeps the collection in this process only
pub async fn open_collection(
    storage_config: &StorageConfig,
    dimension: usize,
    metric: DistanceMetric,
) -> Result<Arc<dyn VectorCollection>> {
    match &storage_config.storage_mode {
        StorageMode::Embedded { path } => {
            let collection = LanceDbCollection::get_or_create(
                path,
                &storage_config.collection_name,
                dimension,
                metric,
            )
            .await?;
            Ok(Arc::new(collection))
        }
        StorageMode::Memory => Ok(Arc::new(MemoryCollection::new(
            &storage_config.collection_name,
            dimension,
            metric,
        ))),
    }
}
