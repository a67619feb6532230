//! CLI `reindex` command: regenerate all embeddings with the current model.

use anyhow::{Context, Result};

use crate::config::LiamConfig;
use crate::embedding;
use crate::memory::{ingest, MemoryStore};

/// Rebuild the memory index from every extracted archive folder.
pub async fn reindex(config: &LiamConfig) -> Result<()> {
    let store = MemoryStore::new(config);
    let log = store.load_log()?;
    let expected: usize = log.archives.iter().map(|a| a.fragments).sum();

    if log.archives.is_empty() {
        println!("No archives to reindex.");
        return Ok(());
    }

    let provider = embedding::create_provider(config).context("failed to create embedding provider")?;
    println!(
        "Reindexing {} archive(s) with model '{}'...",
        log.archives.len(),
        provider.model_name()
    );

    let pb = super::progress_bar(expected as u64);
    let total = ingest::reindex(&store, provider.as_ref(), |done| pb.set_position(done as u64)).await?;
    pb.finish_and_clear();

    println!("Reindexed {total} fragments.");
    Ok(())
}
