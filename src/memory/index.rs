//! Flat-file vector index and brute-force cosine recall.

use anyhow::{Context, Result};
use std::path::Path;

use super::types::{IndexEntry, RecallHit};
use super::{write_atomic, MemoryStore};
use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::MemoryError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    /// Load the index, failing with [`MemoryError::IndexMissing`] if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MemoryError::IndexMissing(path.to_path_buf()).into());
        }
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read memory index {}", path.display()))?;
        let entries: Vec<IndexEntry> = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse memory index {}", path.display()))?;
        Ok(Self { entries })
    }

    /// Load the index, treating a missing file as empty.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(&self.entries)?;
        write_atomic(path, &json)
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = IndexEntry>) {
        self.entries.extend(entries);
    }

    /// Drop every entry past the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Score every entry against `query` and return the best `top_k`, highest first.
    ///
    /// Entries of a different dimension are skipped.
    pub fn rank(&self, query: &[f32], top_k: usize) -> Vec<RecallHit> {
        let mut skipped = 0usize;
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .filter(|entry| {
                let same_dim = entry.embedding.len() == query.len();
                if !same_dim {
                    skipped += 1;
                }
                same_dim
            })
            .map(|entry| (cosine_similarity(query, &entry.embedding), entry))
            .collect();

        if skipped > 0 {
            tracing::warn!(
                skipped,
                query_dim = query.len(),
                "index entries with mismatched dimensions ignored; run `liam reindex`"
            );
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(top_k)
            .map(|(score, entry)| RecallHit {
                score,
                text: entry.content.clone(),
                source: entry.source.clone(),
            })
            .collect()
    }
}

/// Cosine similarity of two equal-length vectors. Zero-norm input scores 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Resolve a caller's `top_k` against the configured default and ceiling.
pub fn clamp_top_k(requested: Option<usize>, retrieval: &RetrievalConfig) -> usize {
    let max = retrieval.max_top_k.max(1);
    requested.unwrap_or(retrieval.default_top_k).clamp(1, max)
}

/// Embed `query` and return the `top_k` most similar stored fragments.
///
/// The query is trimmed and must not be empty. `top_k` is clamped to
/// `1..=max_top_k` of the store.
pub async fn recall(
    store: &MemoryStore,
    embedder: &dyn EmbeddingProvider,
    query: &str,
    top_k: usize,
) -> Result<Vec<RecallHit>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(MemoryError::EmptyQuery.into());
    }
    let top_k = top_k.clamp(1, store.max_top_k());

    let path = store.index_path().to_path_buf();
    let index = tokio::task::spawn_blocking(move || VectorIndex::load(&path))
        .await
        .context("index load task failed")??;

    let query_embedding = embedder
        .embed(query)
        .await
        .context("failed to embed recall query")?;

    let hits = index.rank(&query_embedding, top_k);
    tracing::info!(
        indexed = index.len(),
        top_k,
        returned = hits.len(),
        top_score = hits.first().map(|h| h.score),
        "recall complete"
    );
    Ok(hits)
}
