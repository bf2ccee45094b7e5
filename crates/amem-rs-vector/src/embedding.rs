//! Embedding and distance primitives used by the reference stores.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Default embedding width for [`HashingEmbedder`].
pub const DEFAULT_DIMENSIONS: usize = 256;

/// Turns text into a fixed-width vector.
pub trait Embedder: Send + Sync {
    /// Vector width produced by [`Embedder::embed`].
    fn dimensions(&self) -> usize;

    /// Embed a single document or query.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Deterministic feature-hashing bag-of-words embedder.
///
/// Each lower-cased alphanumeric token is hashed with SHA-256; the first eight
/// digest bytes pick a bucket and the ninth byte picks the sign. The result is
/// L2-normalised, so identical token sets embed identically across runs and
/// platforms.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing `dimensions`-wide vectors (minimum 1).
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(head) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl Embedder for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            let (index, sign) = self.bucket(&token);
            vector[index] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

/// Split text into lower-cased alphanumeric tokens.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// Distance function used to rank neighbours (smaller is closer).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine similarity`, in `[0, 2]`. Zero vectors are at distance 1.
    #[default]
    Cosine,
    /// Squared Euclidean distance.
    L2,
}

impl DistanceMetric {
    /// Distance between two equally sized vectors.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }
                (1.0 - dot / (norm_a * norm_b)).max(0.0)
            }
            DistanceMetric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DistanceMetric, Embedder, HashingEmbedder, tokenize};
    use pretty_assertions::assert_eq;

    #[test]
    fn tokenize_lowercases_and_splits() {
        let tokens: Vec<String> = tokenize("Rust, rust! ML-ops").collect();
        assert_eq!(tokens, vec!["rust", "rust", "ml", "ops"]);
    }

    #[test]
    fn identical_text_has_zero_distance() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("machine learning");
        let b = embedder.embed("Learning, machine");
        assert!(DistanceMetric::Cosine.distance(&a, &b) < 1e-5);
        assert!(DistanceMetric::L2.distance(&a, &b) < 1e-5);
    }

    #[test]
    fn disjoint_tokens_are_far_apart() {
        let embedder = HashingEmbedder::default();
        let python = embedder.embed("python");
        let db = embedder.embed("db");
        assert!(DistanceMetric::Cosine.distance(&python, &db) > 0.9);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        let empty = embedder.embed("  ");
        assert_eq!(empty, vec![0.0; 8]);
        assert_eq!(DistanceMetric::Cosine.distance(&empty, &empty), 1.0);
    }
}
