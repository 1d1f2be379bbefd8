//! In-memory vector collection.
//!
//! Linear scan over every stored vector. Suitable for tests, small reference
//! sets and `storage_mode: memory`; nothing survives the process.

use super::store::{check_dimension, check_metadata, CollectionError, Result, VectorCollection};
use super::types::{DistanceMetric, Document, DocumentRef, QueryHit};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Documents are kept in insertion order, which is also the tie-break order
/// for equal distances.
pub struct MemoryCollection {
    name: String,
    dimension: usize,
    metric: DistanceMetric,
    documents: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>, dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric,
            documents: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn add(&self, document: Document) -> Result<()> {
        check_dimension(self.dimension, &document.vector)?;
        check_metadata(&document.metadata)?;

        let mut docs = self.documents.write().await;
        if docs.iter().any(|d| d.id == document.id) {
            return Err(CollectionError::DuplicateId(document.id));
        }
        docs.push(document);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<DocumentRef>> {
        let docs = self.documents.read().await;
        Ok(docs.iter().find(|d| d.id == id).map(Document::to_ref))
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        check_dimension(self.dimension, vector)?;

        let docs = self.documents.read().await;
        let mut hits: Vec<QueryHit> = docs
            .iter()
            .map(|doc| QueryHit {
                document: doc.to_ref(),
                distance: self.metric.distance(vector, &doc.vector),
            })
            .collect();

        // Stable sort keeps insertion order among equal distances.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        let mut docs = self.documents.write().await;
        let before = docs.len();
        docs.retain(|d| !ids.contains(&d.id));
        Ok(before - docs.len())
    }

    async fn clear(&self) -> Result<()> {
        self.documents.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.documents.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> MemoryCollection {
        MemoryCollection::new("test", 3, DistanceMetric::Cosine)
    }

    #[tokio::test]
    async fn test_query_returns_exact_match_first() {
        let store = collection();
        store.add(Document::new("x", "x-axis", vec![1.0, 0.0, 0.0])).await.unwrap();
        store.add(Document::new("y", "y-axis", vec![0.0, 1.0, 0.0])).await.unwrap();

        let hits = store.query(&[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, "x");
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance_and_caps_k() {
        let store = collection();
        store.add(Document::new("far", "", vec![-1.0, 0.0, 0.0])).await.unwrap();
        store.add(Document::new("near", "", vec![1.0, 0.1, 0.0])).await.unwrap();
        store.add(Document::new("mid", "", vec![0.0, 1.0, 0.0])).await.unwrap();

        let hits = store.query(&[1.0, 0.0, 0.0], 10).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.document.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);

        let hits = store.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_non_finite_metadata_rejected() {
        let store = collection();
        let doc = Document::new("x", "", vec![1.0, 0.0, 0.0]).with_metadata("max_cl", f64::NAN);
        let err = store.add(doc).await.unwrap_err();
        assert!(matches!(err, CollectionError::InvalidMetadata { ref key, .. } if key == "max_cl"));

        let doc = Document::new("x", "", vec![1.0, 0.0, 0.0])
            .with_metadata("max_cl", f64::INFINITY);
        assert!(store.add(doc).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_equal_distances_keep_insertion_order() {
        let store = collection();
        store.add(Document::new("first", "", vec![0.0, 1.0, 0.0])).await.unwrap();
        store.add(Document::new("second", "", vec![0.0, 0.0, 1.0])).await.unwrap();

        let hits = store.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].document.id, "first");
        assert_eq!(hits[1].document.id, "second");
    }

    #[tokio::test]
    async fn test_empty_collection_query() {
        let store = collection();
        assert!(store.query(&[1.0, 0.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = collection();
        store.add(Document::new("a", "one", vec![1.0, 0.0, 0.0])).await.unwrap();
        let err = store
            .add(Document::new("a", "two", vec![0.0, 1.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectionError::DuplicateId(ref id) if id == "a"));
        assert_eq!(store.get("a").await.unwrap().unwrap().text, "one");
    }

    #[tokio::test]
    async fn test_dimension_checked() {
        let store = collection();
        let err = store.add(Document::new("a", "", vec![1.0])).await.unwrap_err();
        assert!(matches!(
            err,
            CollectionError::DimensionMismatch { expected: 3, actual: 1 }
        ));
        assert!(store.query(&[1.0, 0.0], 1).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = collection();
        for id in ["a", "b", "c"] {
            store.add(Document::new(id, "", vec![1.0, 0.0, 0.0])).await.unwrap();
        }

        let removed = store
            .delete(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.get("a").await.unwrap().is_none());

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        store.clear().await.unwrap();
    }
}
