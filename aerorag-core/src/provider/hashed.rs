//! Deterministic offline embeddings.
//!
//! Vectors are drawn from a PRNG seeded with the SHA-256 digest of the input,
//! so the same text maps to the same vector in every process. They carry no
//! semantic meaning: two paraphrases land in unrelated places. Use them for
//! tests and network-less development, never alongside remote vectors.

use super::types::{EmbeddingProvider, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

const MODEL_NAME: &str = "sha256-uniform";

#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dimension: usize,
}

impl HashedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Synchronous form of [`EmbeddingProvider::embed`]; no I/O is involved.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        let mut rng = StdRng::from_seed(seed);
        (0..self.dimension)
            .map(|_| rng.gen_range(-1.0f32..=1.0))
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        MODEL_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_text_same_vector() {
        let embedder = HashedEmbedder::new(32);
        let a = embedder.embed("NACA 23012 airfoil").await.unwrap();
        let b = embedder.embed("NACA 23012 airfoil").await.unwrap();
        assert_eq!(a, b);

        // A fresh instance has no hidden state either.
        let c = HashedEmbedder::new(32).embed("NACA 23012 airfoil").await.unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_different_text_different_vector() {
        let embedder = HashedEmbedder::new(32);
        assert_ne!(embedder.embed_sync("thin"), embedder.embed_sync("thick"));
    }

    #[test]
    fn test_dimension_and_range() {
        let embedder = HashedEmbedder::new(1536);
        let vector = embedder.embed_sync("");
        assert_eq!(vector.len(), 1536);
        assert!(vector.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert_eq!(embedder.dimension(), 1536);
    }

    #[test]
    fn test_shorter_dimension_is_prefix() {
        // Same seed, same stream: a smaller dimension yields a prefix.
        let long = HashedEmbedder::new(16).embed_sync("wing");
        let short = HashedEmbedder::new(4).embed_sync("wing");
        assert_eq!(&long[..4], short.as_slice());
    }
}
