use anyhow::Result;

use crate::config::LiamConfig;
use crate::embedding;
use crate::memory::{index, MemoryStore};

/// Run a recall query from the terminal.
pub async fn recall(config: &LiamConfig, query: &str, top_k: Option<usize>) -> Result<()> {
    let store = MemoryStore::new(config);
    let provider = embedding::create_provider(config)?;

    let top_k = index::clamp_top_k(top_k, &config.retrieval);

    let hits = index::recall(&store, provider.as_ref(), query, top_k).await?;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!("  {}. (score: {:.4}) {}", i + 1, hit.score, hit.source);
        println!("     {}", super::preview(&hit.text, 120));
        println!();
    }

    Ok(())
}
