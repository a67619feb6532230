//! Deterministic bag-of-words embeddings.
//!
//! Each lower-cased alphanumeric token increments one bucket chosen by hashing,
//! and the result is L2-normalized. Texts sharing vocabulary land close together,
//! which is enough for offline recall and for tests.
//!
//! Buckets come from 64-bit FNV-1a, which is fixed across builds and Rust
//! releases, so a saved index stays comparable with new query vectors.

use anyhow::Result;
use async_trait::async_trait;
use fnv::FnvHasher;
use std::hash::Hasher;

use super::EmbeddingProvider;

pub struct HashedEmbeddings {
    dimensions: usize,
}

impl HashedEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            vector[bucket(&token, self.dimensions)] += 1.0;
        }
        l2_normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn model_name(&self) -> &str {
        "hashed"
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn bucket(token: &str, dimensions: usize) -> usize {
    let mut hasher = FnvHasher::default();
    hasher.write(token.as_bytes());
    (hasher.finish() % dimensions as u64) as usize
}

/// L2-normalize in place. Zero vectors are left untouched.
fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_vector() {
        let provider = HashedEmbeddings::new(64);
        assert_eq!(
            provider.embed_text("Rust is a systems language"),
            provider.embed_text("rust IS a systems language!")
        );
    }

    #[test]
    fn buckets_are_pinned() {
        assert_eq!(bucket("a", 1000), 996);
        assert_eq!(bucket("rust", 128), 39);
        assert_eq!(bucket("memory", 128), 110);

        let v = HashedEmbeddings::new(128).embed_text("Rust");
        assert_eq!(v[39], 1.0);
    }

    #[test]
    fn vectors_are_normalized() {
        let provider = HashedEmbeddings::new(64);
        let v = provider.embed_text("the quick brown fox");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let provider = HashedEmbeddings::new(8);
        assert_eq!(provider.embed_text("  ... "), vec![0.0; 8]);
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let provider = HashedEmbeddings::new(16);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let batch = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[0], provider.embed_text("alpha"));
        assert_eq!(batch[1], provider.embed_text("beta"));
    }
}
