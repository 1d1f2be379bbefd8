use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Metadata attached to a document. Keys are unique and iterate in sorted order.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A document stored in the vector collection.
///
/// Documents are immutable once stored; changing one means deleting it and
/// adding it again. Every document in a collection has a vector of the
/// collection's dimension.
///
/// # Example
///
/// ```no_run
/// # use aerorag_core::rag::Document;
/// let embedding = vec![0.1, 0.2, 0.3];
/// let doc = Document::new("airfoil_naca_23012", "NACA 23012 airfoil", embedding)
///     .with_metadata("thickness_percent", 11.6)
///     .with_metadata("source", "uiuc");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            vector,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Stable id derived from the full text, as lowercase SHA-256 hex.
    ///
    /// Re-ingesting the same text produces the same id, so the collection
    /// rejects the repeat instead of storing a duplicate.
    pub fn content_id(text: &str) -> String {
        format!("{:x}", Sha256::digest(text.as_bytes()))
    }

    /// Readable id derived from a reference name: `airfoil_naca_23012`.
    pub fn slug_id(prefix: &str, name: &str) -> String {
        let slug: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}_{}", prefix, slug)
    }

    /// Borrowed view without the vector.
    pub fn to_ref(&self) -> DocumentRef {
        DocumentRef {
            id: self.id.clone(),
            text: self.text.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// The parts of a document a caller sees in search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

/// One neighbour returned by a collection query, with the index's raw distance.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub document: DocumentRef,
    pub distance: f32,
}

/// A ranked retrieval match.
///
/// `rank` is 1-based and assigned after threshold filtering. Results keep the
/// index's return order, so ties in score stay in the order the index gave them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub document: DocumentRef,
    pub score: f32,
    pub distance: f32,
    pub rank: usize,
}

/// Distance metric the index ranks by.
///
/// The engine converts distances back into similarity with
/// [`to_similarity`](Self::to_similarity), so the threshold means the same
/// thing whichever metric is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`, range [0, 2].
    #[default]
    Cosine,
    /// `1 - a·b`; equals cosine on unit vectors.
    Dot,
    /// Squared euclidean distance.
    L2,
}

impl DistanceMetric {
    /// Distance between two equal-length vectors under this metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }
                1.0 - dot / (norm_a * norm_b)
            }
            Self::Dot => 1.0 - a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
            Self::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        }
    }

    /// Similarity score for a distance reported by the index.
    pub fn to_similarity(&self, distance: f32) -> f32 {
        match self {
            Self::Cosine | Self::Dot => 1.0 - distance,
            Self::L2 => 1.0 / (1.0 + distance),
        }
    }
}
